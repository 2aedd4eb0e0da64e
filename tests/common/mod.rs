// ====================================================================================
// tests/common/mod.rs - 测试用的内存服务端与视图
// ====================================================================================
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use seat_booking_client::{
    api::SeatApi,
    clock::ManualClock,
    config::Config,
    error::{AppError, AppResult},
    models::{
        BookSeatsRequest, BookSeatsResponse, BookingHandoff, BookingId, CancelBookingResponse,
        CheckSeatsResponse, DeselectSeatResponse, ScheduleId, SeatAvailability, SeatNumber,
        SeatStatusResponse, SelectSeatResponse, TemporarySelection, UserId,
    },
    render::SeatRender,
    sync::SeatStatusSync,
    view::{Navigator, NoticeLevel, Notifier, SeatView},
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const SCHEDULE: ScheduleId = 12;
pub const ME: UserId = 7;
pub const OTHER: UserId = 9;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
}

#[derive(Default)]
pub struct ServerState {
    pub total_seats: u32,
    pub booked: BTreeSet<SeatNumber>,
    pub holds: HashMap<SeatNumber, (UserId, String, DateTime<Utc>)>,
    pub fail_status: bool,
    pub fail_deselect: bool,
    pub reject_select: Option<String>,
    pub unavailable_on_check: Vec<SeatNumber>,
    pub reject_check: Option<String>,
    pub check_omits_ids: bool,
    pub book_error: Option<String>,
    pub next_booking_id: BookingId,
    pub last_booking: Option<BookSeatsRequest>,
}

#[derive(Default)]
pub struct Calls {
    pub status: AtomicUsize,
    pub select: AtomicUsize,
    pub deselect: AtomicUsize,
    pub check: AtomicUsize,
    pub book: AtomicUsize,
    pub cancel: AtomicUsize,
}

// 内存中的订票服务端，经它占的座都属于 user
pub struct MockSeatApi {
    pub user: UserId,
    pub state: Mutex<ServerState>,
    pub calls: Calls,
    pub book_gate: Mutex<Option<Arc<Notify>>>,
    pub book_started: Notify,
}

impl MockSeatApi {
    pub fn new(total_seats: u32) -> Arc<Self> {
        Arc::new(Self {
            user: ME,
            state: Mutex::new(ServerState {
                total_seats,
                next_booking_id: 100,
                ..Default::default()
            }),
            calls: Calls::default(),
            book_gate: Mutex::new(None),
            book_started: Notify::new(),
        })
    }

    pub fn with_state(&self, f: impl FnOnce(&mut ServerState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn hold_for(&self, seat: SeatNumber, user: UserId, name: &str, expires_at: DateTime<Utc>) {
        self.with_state(|s| {
            s.holds.insert(seat, (user, name.to_string(), expires_at));
        });
    }

    pub fn gate_bookings(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.book_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeatApi for MockSeatApi {
    async fn seat_status(&self, _schedule_id: ScheduleId) -> AppResult<SeatStatusResponse> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        let s = self.state.lock().unwrap();
        if s.fail_status {
            return Err(AppError::Server { status: 500, message: "Internal server error".into() });
        }
        let available = (1..=s.total_seats)
            .filter(|seat| !s.booked.contains(seat) && !s.holds.contains_key(seat))
            .collect();
        let temporary_selections = s
            .holds
            .iter()
            .map(|(seat, (user, name, expires))| {
                (
                    *seat,
                    TemporarySelection { user_id: *user, username: name.clone(), expires_at: *expires },
                )
            })
            .collect();
        Ok(SeatStatusResponse {
            booked_seats: s.booked.iter().copied().collect(),
            available_seats: available,
            temporary_selections,
            total_seats: Some(s.total_seats),
        })
    }

    async fn seat_availability(&self, _schedule_id: ScheduleId) -> AppResult<SeatAvailability> {
        let s = self.state.lock().unwrap();
        let available = (1..=s.total_seats)
            .filter(|seat| !s.booked.contains(seat) && !s.holds.contains_key(seat))
            .count() as u32;
        Ok(SeatAvailability {
            available_count: available,
            total_seats: s.total_seats,
            booked_seats: s.booked.iter().copied().collect(),
        })
    }

    async fn select_seat(&self, _schedule_id: ScheduleId, seat: SeatNumber) -> AppResult<SelectSeatResponse> {
        self.calls.select.fetch_add(1, Ordering::SeqCst);
        let mut s = self.state.lock().unwrap();
        let refusal = if let Some(reason) = s.reject_select.clone() {
            Some(reason)
        } else if s.booked.contains(&seat) {
            Some(format!("Seat {} is already booked", seat))
        } else if s.holds.get(&seat).is_some_and(|(user, _, _)| *user != self.user) {
            Some(format!("Seat {} is temporarily selected by another user", seat))
        } else {
            None
        };
        if let Some(error) = refusal {
            return Ok(SelectSeatResponse { success: false, error: Some(error), message: None });
        }
        s.holds.insert(seat, (self.user, "me".to_string(), t0() + Duration::minutes(5)));
        Ok(SelectSeatResponse {
            success: true,
            error: None,
            message: Some(format!("Seat {} temporarily selected", seat)),
        })
    }

    async fn deselect_seat(&self, _schedule_id: ScheduleId, seat: SeatNumber) -> AppResult<DeselectSeatResponse> {
        self.calls.deselect.fetch_add(1, Ordering::SeqCst);
        let mut s = self.state.lock().unwrap();
        if s.fail_deselect {
            return Err(AppError::Server { status: 500, message: "Internal server error".into() });
        }
        let owned = s.holds.get(&seat).is_some_and(|(user, _, _)| *user == self.user);
        if owned {
            s.holds.remove(&seat);
            Ok(DeselectSeatResponse { success: true, message: Some(format!("Seat {} deselected", seat)) })
        } else {
            Ok(DeselectSeatResponse {
                success: false,
                message: Some("No temporary selection found for this seat".into()),
            })
        }
    }

    async fn check_seats(&self, _schedule_id: ScheduleId, seats: &[SeatNumber]) -> AppResult<CheckSeatsResponse> {
        self.calls.check.fetch_add(1, Ordering::SeqCst);
        let s = self.state.lock().unwrap();
        if let Some(error) = s.reject_check.clone() {
            return Err(AppError::Server { status: 400, message: error });
        }
        if s.check_omits_ids {
            return Ok(CheckSeatsResponse { all_available: false, unavailable_seats: Vec::new() });
        }
        let unavailable: Vec<SeatNumber> = seats
            .iter()
            .copied()
            .filter(|seat| s.booked.contains(seat) || s.unavailable_on_check.contains(seat))
            .collect();
        Ok(CheckSeatsResponse { all_available: unavailable.is_empty(), unavailable_seats: unavailable })
    }

    async fn book_seats(&self, request: &BookSeatsRequest) -> AppResult<BookSeatsResponse> {
        self.calls.book.fetch_add(1, Ordering::SeqCst);
        self.book_started.notify_one();
        let gate = self.book_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut s = self.state.lock().unwrap();
        s.last_booking = Some(request.clone());
        if let Some(error) = s.book_error.clone() {
            return Ok(BookSeatsResponse { success: false, booking_id: None, total_amount: None, error: Some(error) });
        }
        for seat in &request.seat_numbers {
            s.holds.remove(seat);
            s.booked.insert(*seat);
        }
        let booking_id = s.next_booking_id;
        s.next_booking_id += 1;
        Ok(BookSeatsResponse {
            success: true,
            booking_id: Some(booking_id),
            total_amount: Some(500.0 * request.seat_numbers.len() as f64),
            error: None,
        })
    }

    async fn cancel_booking(&self, booking_id: BookingId) -> AppResult<CancelBookingResponse> {
        self.calls.cancel.fetch_add(1, Ordering::SeqCst);
        if booking_id == 999 {
            return Err(AppError::Server { status: 400, message: "Cannot cancel a confirmed booking".into() });
        }
        Ok(CancelBookingResponse { success: true, error: None, message: Some("Booking cancelled successfully".into()) })
    }
}

pub struct RecordingView {
    pub seats: Vec<SeatNumber>,
    pub renders: Mutex<Vec<Vec<SeatRender>>>,
}

impl RecordingView {
    pub fn new(total: u32) -> Arc<Self> {
        Arc::new(Self { seats: (1..=total).collect(), renders: Mutex::new(Vec::new()) })
    }

    pub fn passes(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn last(&self, seat: SeatNumber) -> Option<SeatRender> {
        self.renders
            .lock()
            .unwrap()
            .last()
            .and_then(|pass| pass.iter().find(|r| r.seat == seat).cloned())
    }
}

impl SeatView for RecordingView {
    fn seat_ids(&self) -> Vec<SeatNumber> {
        self.seats.clone()
    }

    fn apply(&self, renders: &[SeatRender]) {
        self.renders.lock().unwrap().push(renders.to_vec());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub handoffs: Mutex<Vec<BookingHandoff>>,
}

impl Navigator for RecordingNavigator {
    fn go_to_payment(&self, handoff: &BookingHandoff) {
        self.handoffs.lock().unwrap().push(handoff.clone());
    }
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(t0()))
}

pub fn sync_for(api: &Arc<MockSeatApi>, view: &Arc<RecordingView>, clock: &Arc<ManualClock>) -> Arc<SeatStatusSync> {
    Arc::new(SeatStatusSync::new(
        api.clone(),
        view.clone(),
        clock.clone(),
        SCHEDULE,
        ME,
        tokio::time::Duration::from_secs(5),
    ))
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "SCHEDULE_ID" => Some(SCHEDULE.to_string()),
        "CURRENT_USER_ID" => Some(ME.to_string()),
        _ => None,
    })
    .unwrap()
}
