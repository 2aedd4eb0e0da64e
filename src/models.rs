// ====================================================================================
// src/models.rs - 数据模型定义
// ====================================================================================
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type SeatNumber = u32;
pub type ScheduleId = u64;
pub type UserId = u64;
pub type BookingId = u64;

// 座位状态接口响应 (GET /schedules/{id}/seat_status/)
#[derive(Debug, Clone, Deserialize)]
pub struct SeatStatusResponse {
    #[serde(default)]
    pub booked_seats: Vec<SeatNumber>,
    #[serde(default)]
    pub available_seats: Vec<SeatNumber>,
    // JSON 对象的键是字符串，serde_json 会解析为数字
    #[serde(default)]
    pub temporary_selections: HashMap<SeatNumber, TemporarySelection>,
    #[serde(default)]
    pub total_seats: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemporarySelection {
    pub user_id: UserId,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

// 临时占座信息，过期时间只用于显示倒计时
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldInfo {
    pub holder_id: UserId,
    pub holder_name: String,
    pub expires_at: DateTime<Utc>,
}

impl From<TemporarySelection> for HoldInfo {
    fn from(t: TemporarySelection) -> Self {
        Self {
            holder_id: t.user_id,
            holder_name: t.username,
            expires_at: t.expires_at,
        }
    }
}

// 选座/取消选座请求
#[derive(Debug, Clone, Serialize)]
pub struct SeatSelectionRequest {
    pub schedule_id: ScheduleId,
    pub seat_number: SeatNumber,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectSeatResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeselectSeatResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// 余座概览 (GET /schedules/{id}/seat_availability/)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SeatAvailability {
    pub available_count: u32,
    pub total_seats: u32,
    #[serde(default)]
    pub booked_seats: Vec<SeatNumber>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckSeatsRequest {
    pub seat_numbers: Vec<SeatNumber>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSeatsResponse {
    pub all_available: bool,
    #[serde(default)]
    pub unavailable_seats: Vec<SeatNumber>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookSeatsRequest {
    pub schedule_id: ScheduleId,
    pub passenger_name: String,
    pub passenger_email: String,
    pub passenger_phone: String,
    pub seat_numbers: Vec<SeatNumber>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookSeatsResponse {
    pub success: bool,
    #[serde(default)]
    pub booking_id: Option<BookingId>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelBookingResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// 非 2xx 响应体，服务端用 error / message / detail (认证、权限错误) 描述原因
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn reason(self) -> Option<String> {
        self.error.or(self.message).or(self.detail)
    }
}

// 乘客信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassengerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

// 预订成功后交给支付流程的信息
#[derive(Debug, Clone, PartialEq)]
pub struct BookingHandoff {
    pub booking_id: BookingId,
    pub seats: Vec<SeatNumber>,
    pub total_amount: Option<f64>,
    pub payment_path: String,
}

impl BookingHandoff {
    pub fn new(booking_id: BookingId, seats: Vec<SeatNumber>, total_amount: Option<f64>) -> Self {
        Self {
            booking_id,
            seats,
            total_amount,
            payment_path: format!("/payment/{}/", booking_id),
        }
    }
}

// toggle 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Selected(SeatNumber),
    Deselected(SeatNumber),
}
