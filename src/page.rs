// ====================================================================================
// src/page.rs - 页面装配: 创建控制器并连接视图事件
// ====================================================================================
use crate::{
    api::SeatApi,
    clock::Clock,
    config::Config,
    error::{AppError, ErrorKind},
    models::{BookingHandoff, BookingId, PassengerInfo, SeatNumber, SelectionChange},
    render::seat_name,
    selection::SelectionController,
    sync::SeatStatusSync,
    view::{Navigator, NoticeLevel, Notifier, SeatActivation, SeatView},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Duration;

// 一个订座页面: 持有两个控制器并分发视图事件
pub struct SeatBookingPage {
    sync: Arc<SeatStatusSync>,
    selection: Arc<SelectionController>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    seats_per_row: u32,
}

impl SeatBookingPage {
    pub fn new(
        config: &Config,
        api: Arc<dyn SeatApi>,
        view: Arc<dyn SeatView>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let sync = Arc::new(
            SeatStatusSync::new(
                api.clone(),
                view,
                clock,
                config.schedule_id,
                config.current_user_id,
                Duration::from_secs(config.poll_interval_seconds),
            )
            .with_seats_per_row(config.seats_per_row),
        );
        let selection = Arc::new(SelectionController::new(
            api,
            sync.clone(),
            config.current_user_id,
            config.max_seats,
        ));

        Self {
            sync,
            selection,
            notifier,
            navigator,
            seats_per_row: config.seats_per_row,
        }
    }

    pub fn sync(&self) -> &Arc<SeatStatusSync> {
        &self.sync
    }

    pub fn selection(&self) -> &Arc<SelectionController> {
        &self.selection
    }

    pub fn mount(&self) {
        self.sync.start();
    }

    // 页面卸载: 停止轮询并清空本地选择
    pub fn teardown(&self) {
        self.sync.stop();
        self.selection.clear();
    }

    pub fn on_visibility_changed(&self, visible: bool) {
        self.sync.set_page_visible(visible);
    }

    pub fn on_focus_changed(&self, focused: bool) {
        self.sync.set_page_focused(focused);
    }

    fn report(&self, err: &AppError) {
        let level = match err.kind() {
            ErrorKind::Validation | ErrorKind::Conflict => NoticeLevel::Warning,
            ErrorKind::Transport | ErrorKind::Config => NoticeLevel::Error,
        };
        self.notifier.notify(level, &err.user_message());
    }

    pub async fn on_submit(&self, passenger: &PassengerInfo) -> Option<BookingHandoff> {
        match self.selection.submit(passenger).await {
            Ok(handoff) => {
                self.notifier.notify(NoticeLevel::Success, "Seats booked successfully");
                self.navigator.go_to_payment(&handoff);
                Some(handoff)
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    pub async fn on_cancel_booking(&self, booking_id: BookingId) -> bool {
        match self.selection.cancel_booking(booking_id).await {
            Ok(()) => {
                self.notifier.notify(NoticeLevel::Success, "Booking cancelled successfully");
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }
}

#[async_trait]
impl SeatActivation for SeatBookingPage {
    async fn on_seat_activated(&self, seat: SeatNumber) {
        let name = seat_name(seat, self.seats_per_row);
        match self.selection.toggle(seat).await {
            Ok(change) => {
                let message = match change {
                    SelectionChange::Selected(_) => format!("Seat {} selected", name),
                    SelectionChange::Deselected(_) => format!("Seat {} deselected", name),
                };
                self.notifier.notify(NoticeLevel::Info, &message);
                // 让自己的占座尽快显示出来
                let _ = self.sync.refresh_once().await;
            }
            Err(e) => self.report(&e),
        }
    }
}
