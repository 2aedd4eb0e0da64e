// ====================================================================================
// src/selection.rs - 选座控制器: 本地选座、提交前复核、预订
// ====================================================================================
use crate::{
    api::SeatApi,
    error::{AppError, AppResult},
    models::{
        BookSeatsRequest, BookingHandoff, BookingId, PassengerInfo, ScheduleId, SeatNumber,
        SelectionChange, UserId,
    },
    sync::SeatStatusSync,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// 当前用户已选但尚未预订的座位
// 请求中的座位记为 pending，同样占用 max_seats 名额
#[derive(Debug, Clone)]
pub struct LocalSelection {
    max_seats: usize,
    seats: BTreeSet<SeatNumber>,
    pending: BTreeSet<SeatNumber>,
}

impl LocalSelection {
    pub fn new(max_seats: usize) -> Self {
        Self {
            max_seats,
            seats: BTreeSet::new(),
            pending: BTreeSet::new(),
        }
    }

    pub fn max_seats(&self) -> usize {
        self.max_seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn contains(&self, seat: SeatNumber) -> bool {
        self.seats.contains(&seat)
    }

    pub fn is_pending(&self, seat: SeatNumber) -> bool {
        self.pending.contains(&seat)
    }

    pub fn seats(&self) -> Vec<SeatNumber> {
        self.seats.iter().copied().collect()
    }

    // 占用一个名额，等待服务端确认
    pub fn reserve(&mut self, seat: SeatNumber) -> AppResult<()> {
        if self.pending.contains(&seat) {
            return Err(AppError::Conflict(format!(
                "Seat {} is already being selected",
                seat
            )));
        }
        if self.seats.len() + self.pending.len() >= self.max_seats {
            return Err(AppError::SelectionLimit { max_seats: self.max_seats });
        }
        self.pending.insert(seat);
        Ok(())
    }

    pub fn confirm(&mut self, seat: SeatNumber) {
        if self.pending.remove(&seat) {
            self.seats.insert(seat);
        }
    }

    // 直接并入已确认的座位（页面重新加载后恢复自己的占座），名额已满时返回 false
    pub fn adopt(&mut self, seat: SeatNumber) -> bool {
        if self.seats.contains(&seat) {
            return true;
        }
        if self.seats.len() + self.pending.len() >= self.max_seats {
            return false;
        }
        self.seats.insert(seat);
        true
    }

    pub fn release(&mut self, seat: SeatNumber) {
        self.pending.remove(&seat);
    }

    pub fn remove(&mut self, seat: SeatNumber) -> bool {
        self.seats.remove(&seat)
    }

    pub fn clear(&mut self) {
        self.seats.clear();
    }
}

// 预订进行中的标记，离开作用域时自动释放
struct BookingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BookingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BookingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SelectionController {
    api: Arc<dyn SeatApi>,
    sync: Arc<SeatStatusSync>,
    schedule_id: ScheduleId,
    current_user_id: UserId,
    selection: Mutex<LocalSelection>,
    booking_in_flight: AtomicBool,
    holds_adopted: AtomicBool,
}

impl SelectionController {
    pub fn new(
        api: Arc<dyn SeatApi>,
        sync: Arc<SeatStatusSync>,
        current_user_id: UserId,
        max_seats: usize,
    ) -> Self {
        Self {
            api,
            schedule_id: sync.schedule_id(),
            sync,
            current_user_id,
            selection: Mutex::new(LocalSelection::new(max_seats)),
            booking_in_flight: AtomicBool::new(false),
            holds_adopted: AtomicBool::new(false),
        }
    }

    fn local(&self) -> MutexGuard<'_, LocalSelection> {
        self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn selected_seats(&self) -> Vec<SeatNumber> {
        self.local().seats()
    }

    pub fn is_selected(&self, seat: SeatNumber) -> bool {
        self.local().contains(seat)
    }

    pub fn max_seats(&self) -> usize {
        self.local().max_seats()
    }

    pub fn is_submitting(&self) -> bool {
        self.booking_in_flight.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.local().clear();
    }

    // 冲突类错误后强制刷新快照，使显示与服务端一致
    async fn refresh_after(&self, err: &AppError) {
        if err.is_conflict() {
            let _ = self.sync.refresh_once().await;
        }
    }

    // 第一次拿到快照时，把服务端记录的自己的占座并入本地选择
    fn adopt_own_holds(&self) {
        if self.holds_adopted.load(Ordering::Acquire) {
            return;
        }
        let Some(snap) = self.sync.latest() else {
            return;
        };
        if self.holds_adopted.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut own: Vec<SeatNumber> = snap
            .temporary_holds
            .keys()
            .copied()
            .filter(|seat| snap.is_held_by(*seat, self.current_user_id))
            .collect();
        own.sort_unstable();

        let mut local = self.local();
        for seat in own {
            if local.adopt(seat) {
                tracing::debug!("恢复已有占座 {}，班次 {}", seat, self.schedule_id);
            } else {
                tracing::warn!("已有占座 {} 超出选座上限，未计入本地选择", seat);
            }
        }
    }

    // 未选则选，已选则取消
    pub async fn toggle(&self, seat: SeatNumber) -> AppResult<SelectionChange> {
        self.adopt_own_holds();
        let held_by_me = self
            .sync
            .latest()
            .is_some_and(|snap| snap.is_held_by(seat, self.current_user_id));

        if self.is_selected(seat) || held_by_me {
            self.deselect(seat).await?;
            return Ok(SelectionChange::Deselected(seat));
        }

        self.select(seat).await?;
        Ok(SelectionChange::Selected(seat))
    }

    pub async fn select(&self, seat: SeatNumber) -> AppResult<()> {
        // 名额检查在任何网络请求之前
        self.local().reserve(seat)?;

        if let Some(snap) = self.sync.latest() {
            if snap.is_taken_for(seat, self.current_user_id) {
                self.local().release(seat);
                return Err(AppError::Conflict(format!("Seat {} is not available", seat)));
            }
        }

        let result = match self.api.select_seat(self.schedule_id, seat).await {
            Ok(resp) if resp.success => Ok(()),
            Ok(resp) => Err(AppError::Conflict(
                resp.error
                    .or(resp.message)
                    .unwrap_or_else(|| format!("Seat {} could not be selected", seat)),
            )),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.local().confirm(seat);
                tracing::debug!("已选座位 {}，班次 {}", seat, self.schedule_id);
                Ok(())
            }
            Err(e) => {
                self.local().release(seat);
                tracing::warn!("选座失败，座位 {}: {}", seat, e);
                self.refresh_after(&e).await;
                Err(e)
            }
        }
    }

    // 释放占座，服务端确认后才从本地选择中移除
    pub async fn deselect(&self, seat: SeatNumber) -> AppResult<()> {
        let result = match self.api.deselect_seat(self.schedule_id, seat).await {
            Ok(resp) if resp.success => Ok(()),
            Ok(resp) => Err(AppError::Conflict(
                resp.message
                    .unwrap_or_else(|| format!("Seat {} could not be released", seat)),
            )),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.local().remove(seat);
                tracing::debug!("已取消座位 {}，班次 {}", seat, self.schedule_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("取消选座失败，座位 {}: {}", seat, e);
                self.refresh_after(&e).await;
                Err(e)
            }
        }
    }

    pub async fn submit(&self, passenger: &PassengerInfo) -> AppResult<BookingHandoff> {
        let Some(_guard) = BookingGuard::acquire(&self.booking_in_flight) else {
            let err = AppError::Busy;
            self.refresh_after(&err).await;
            return Err(err);
        };

        self.adopt_own_holds();
        let seats = self.selected_seats();
        if seats.is_empty() {
            return Err(AppError::Validation("Please select at least one seat".to_string()));
        }
        validate_passenger(passenger)?;

        // 提交前向服务端复核所选座位
        let check = match self.api.check_seats(self.schedule_id, &seats).await {
            Ok(check) => check,
            Err(e) => {
                tracing::warn!("提交前复核请求失败: {}", e);
                self.refresh_after(&e).await;
                return Err(e);
            }
        };
        if !check.all_available || !check.unavailable_seats.is_empty() {
            // 服务端未列出具体座位时，按全部所选座位报告
            let unavailable = if check.unavailable_seats.is_empty() {
                seats.clone()
            } else {
                check.unavailable_seats
            };
            tracing::warn!("提交前复核失败，不可用座位: {:?}", unavailable);
            self.prune_taken(&unavailable).await;
            return Err(AppError::SeatsUnavailable(unavailable));
        }

        let request = BookSeatsRequest {
            schedule_id: self.schedule_id,
            passenger_name: passenger.name.trim().to_string(),
            passenger_email: passenger.email.trim().to_string(),
            passenger_phone: passenger.phone.trim().to_string(),
            seat_numbers: seats.clone(),
        };

        let result = match self.api.book_seats(&request).await {
            Ok(resp) if resp.success => match resp.booking_id {
                Some(booking_id) => Ok(BookingHandoff::new(booking_id, seats, resp.total_amount)),
                None => Err(AppError::Conflict("Booking response carried no booking id".to_string())),
            },
            Ok(resp) => Err(AppError::Conflict(
                resp.error.unwrap_or_else(|| "Booking failed".to_string()),
            )),
            Err(e) => Err(e),
        };

        match result {
            Ok(handoff) => {
                self.local().clear();
                tracing::info!(
                    "预订成功，预订号 {}，座位 {:?}",
                    handoff.booking_id,
                    handoff.seats
                );
                Ok(handoff)
            }
            Err(e) => {
                tracing::warn!("预订失败: {}", e);
                self.refresh_after(&e).await;
                Err(e)
            }
        }
    }

    // 刷新快照后，移除已被预订或被他人占用的座位
    async fn prune_taken(&self, unavailable: &[SeatNumber]) {
        let Ok(snapshot) = self.sync.refresh_once().await else {
            return;
        };
        let mut local = self.local();
        for seat in unavailable {
            if snapshot.is_taken_for(*seat, self.current_user_id) && local.remove(*seat) {
                tracing::info!("座位 {} 已不可用，已从选择中移除", seat);
            }
        }
    }

    pub async fn cancel_booking(&self, booking_id: BookingId) -> AppResult<()> {
        let result = match self.api.cancel_booking(booking_id).await {
            Ok(resp) if resp.success => Ok(()),
            Ok(resp) => Err(AppError::Conflict(
                resp.error
                    .or(resp.message)
                    .unwrap_or_else(|| format!("Booking {} could not be cancelled", booking_id)),
            )),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("预订 {} 已取消", booking_id);
                let _ = self.sync.refresh_once().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("取消预订 {} 失败: {}", booking_id, e);
                self.refresh_after(&e).await;
                Err(e)
            }
        }
    }
}

fn validate_passenger(passenger: &PassengerInfo) -> AppResult<()> {
    let fields = [
        ("passenger name", &passenger.name),
        ("passenger email", &passenger.email),
        ("passenger phone", &passenger.phone),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("Please enter the {}", field)));
        }
    }
    if !passenger.email.contains('@') {
        return Err(AppError::Validation("Please enter a valid passenger email".to_string()));
    }
    Ok(())
}
