// ====================================================================================
// src/view.rs - 视图抽象: 座位视图、通知、页面跳转
// ====================================================================================
use crate::models::{BookingHandoff, SeatNumber};
use crate::render::SeatRender;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

// 页面上的座位元素，以及重绘它们的方式
pub trait SeatView: Send + Sync {
    fn seat_ids(&self) -> Vec<SeatNumber>;
    fn apply(&self, renders: &[SeatRender]);
}

// 座位被点击时视图回调的入口
#[async_trait]
pub trait SeatActivation: Send + Sync {
    async fn on_seat_activated(&self, seat: SeatNumber);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

pub trait Navigator: Send + Sync {
    fn go_to_payment(&self, handoff: &BookingHandoff);
}

// 终端宿主用的视图: 只在座位状态变化时输出日志
pub struct LoggingSeatView {
    seats: Vec<SeatNumber>,
    last: Mutex<HashMap<SeatNumber, SeatRender>>,
}

impl LoggingSeatView {
    pub fn new(seats: Vec<SeatNumber>) -> Self {
        Self { seats, last: Mutex::new(HashMap::new()) }
    }

    pub fn current(&self) -> Vec<SeatRender> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let mut renders: Vec<SeatRender> = last.values().cloned().collect();
        renders.sort_by_key(|r| r.seat);
        renders
    }
}

impl SeatView for LoggingSeatView {
    fn seat_ids(&self) -> Vec<SeatNumber> {
        self.seats.clone()
    }

    fn apply(&self, renders: &[SeatRender]) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        for render in renders {
            if last.get(&render.seat) != Some(render) {
                tracing::info!("座位 {} [{}]: {}", render.name, render.css_class(), render.label);
                last.insert(render.seat, render.clone());
            }
        }
    }
}

pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", message),
            NoticeLevel::Warning => tracing::warn!("{}", message),
            NoticeLevel::Error => tracing::error!("{}", message),
        }
    }
}

pub struct LoggingNavigator {
    pub base_url: String,
}

impl Navigator for LoggingNavigator {
    fn go_to_payment(&self, handoff: &BookingHandoff) {
        tracing::info!(
            "预订 {} 已创建，前往支付: {}{}",
            handoff.booking_id,
            self.base_url.trim_end_matches('/'),
            handoff.payment_path
        );
    }
}
