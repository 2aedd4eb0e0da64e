// ====================================================================================
// src/api.rs - 订票服务端 HTTP 接口
// ====================================================================================
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        BookSeatsRequest, BookSeatsResponse, BookingId, CancelBookingResponse, CheckSeatsRequest,
        CheckSeatsResponse, DeselectSeatResponse, ErrorBody, ScheduleId, SeatAvailability,
        SeatNumber, SeatSelectionRequest, SeatStatusResponse, SelectSeatResponse,
    },
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, COOKIE},
    Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use tokio::time::Duration;

pub const CSRF_HEADER: &str = "X-CSRFToken";

// 订座页面用到的服务端接口
#[async_trait]
pub trait SeatApi: Send + Sync {
    async fn seat_status(&self, schedule_id: ScheduleId) -> AppResult<SeatStatusResponse>;

    async fn seat_availability(&self, schedule_id: ScheduleId) -> AppResult<SeatAvailability>;

    async fn select_seat(&self, schedule_id: ScheduleId, seat: SeatNumber) -> AppResult<SelectSeatResponse>;

    async fn deselect_seat(&self, schedule_id: ScheduleId, seat: SeatNumber) -> AppResult<DeselectSeatResponse>;

    async fn check_seats(&self, schedule_id: ScheduleId, seats: &[SeatNumber]) -> AppResult<CheckSeatsResponse>;

    async fn book_seats(&self, request: &BookSeatsRequest) -> AppResult<BookSeatsResponse>;

    async fn cancel_booking(&self, booking_id: BookingId) -> AppResult<CancelBookingResponse>;
}

pub struct HttpSeatApi {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl HttpSeatApi {
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie_header(config) {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|_| AppError::Config("session cookie contains invalid characters".to_string()))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            csrf_token: config.csrf_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // 所有修改类请求都带 CSRF 头
    fn post(&self, path: &str) -> RequestBuilder {
        let builder = self.client.post(self.url(path));
        match &self.csrf_token {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = builder.send().await?;
        read_json(response).await
    }
}

fn cookie_header(config: &Config) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(token) = &config.csrf_token {
        parts.push(format!("csrftoken={}", token));
    }
    if let Some(session) = &config.session_id {
        parts.push(format!("sessionid={}", session));
    }
    if parts.is_empty() { None } else { Some(parts.join("; ")) }
}

// 非 2xx 时从响应体中提取服务端给出的原因
async fn read_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::reason)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });

    Err(AppError::Server { status: status.as_u16(), message })
}

#[async_trait]
impl SeatApi for HttpSeatApi {
    async fn seat_status(&self, schedule_id: ScheduleId) -> AppResult<SeatStatusResponse> {
        let url = self.url(&format!("/schedules/{}/seat_status/", schedule_id));
        tracing::debug!("GET {}", url);
        self.send_json(self.client.get(url)).await
    }

    async fn seat_availability(&self, schedule_id: ScheduleId) -> AppResult<SeatAvailability> {
        let url = self.url(&format!("/schedules/{}/seat_availability/", schedule_id));
        tracing::debug!("GET {}", url);
        self.send_json(self.client.get(url)).await
    }

    async fn select_seat(&self, schedule_id: ScheduleId, seat: SeatNumber) -> AppResult<SelectSeatResponse> {
        tracing::debug!("选座请求: 班次 {}，座位 {}", schedule_id, seat);
        let body = SeatSelectionRequest { schedule_id, seat_number: seat };
        self.send_json(self.post("/temporary-selections/select_seat/").json(&body)).await
    }

    async fn deselect_seat(&self, schedule_id: ScheduleId, seat: SeatNumber) -> AppResult<DeselectSeatResponse> {
        tracing::debug!("取消选座请求: 班次 {}，座位 {}", schedule_id, seat);
        let body = SeatSelectionRequest { schedule_id, seat_number: seat };
        self.send_json(self.post("/temporary-selections/deselect_seat/").json(&body)).await
    }

    async fn check_seats(&self, schedule_id: ScheduleId, seats: &[SeatNumber]) -> AppResult<CheckSeatsResponse> {
        let body = CheckSeatsRequest { seat_numbers: seats.to_vec() };
        let path = format!("/schedules/{}/check_seats/", schedule_id);
        self.send_json(self.post(&path).json(&body)).await
    }

    async fn book_seats(&self, request: &BookSeatsRequest) -> AppResult<BookSeatsResponse> {
        tracing::debug!("提交预订: 班次 {}，座位 {:?}", request.schedule_id, request.seat_numbers);
        self.send_json(self.post("/bookings/book_seats/").json(request)).await
    }

    async fn cancel_booking(&self, booking_id: BookingId) -> AppResult<CancelBookingResponse> {
        let path = format!("/bookings/{}/cancel_booking/", booking_id);
        self.send_json(self.post(&path)).await
    }
}
