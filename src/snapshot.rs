// ====================================================================================
// src/snapshot.rs - 座位状态快照
// ====================================================================================
use crate::models::{HoldInfo, SeatNumber, SeatStatusResponse, UserId};
use std::collections::{BTreeSet, HashMap};

// 某班次的完整座位状态，每次轮询整体替换
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatSnapshot {
    pub booked_seats: BTreeSet<SeatNumber>,
    pub available_seats: BTreeSet<SeatNumber>,
    pub temporary_holds: HashMap<SeatNumber, HoldInfo>,
    pub total_seats: Option<u32>,
}

// 座位分类，优先级: 已订 > 临时占座 > 可用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatStatus<'a> {
    Booked,
    Held(&'a HoldInfo),
    Available,
    Unknown,
}

// 快照中违反"互斥且完备"约束的情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotAnomaly {
    BookedAndAvailable(SeatNumber),
    BookedAndHeld(SeatNumber),
    HeldAndAvailable(SeatNumber),
    Missing(SeatNumber),
}

impl From<SeatStatusResponse> for SeatSnapshot {
    fn from(resp: SeatStatusResponse) -> Self {
        Self {
            booked_seats: resp.booked_seats.into_iter().collect(),
            available_seats: resp.available_seats.into_iter().collect(),
            temporary_holds: resp
                .temporary_selections
                .into_iter()
                .map(|(seat, t)| (seat, HoldInfo::from(t)))
                .collect(),
            total_seats: resp.total_seats,
        }
    }
}

impl SeatSnapshot {
    pub fn status(&self, seat: SeatNumber) -> SeatStatus<'_> {
        if self.booked_seats.contains(&seat) {
            SeatStatus::Booked
        } else if let Some(hold) = self.temporary_holds.get(&seat) {
            SeatStatus::Held(hold)
        } else if self.available_seats.contains(&seat) {
            SeatStatus::Available
        } else {
            SeatStatus::Unknown
        }
    }

    pub fn is_held_by(&self, seat: SeatNumber, user_id: UserId) -> bool {
        matches!(self.status(seat), SeatStatus::Held(h) if h.holder_id == user_id)
    }

    // 已被预订或被其他用户临时占用
    pub fn is_taken_for(&self, seat: SeatNumber, user_id: UserId) -> bool {
        match self.status(seat) {
            SeatStatus::Booked => true,
            SeatStatus::Held(h) => h.holder_id != user_id,
            SeatStatus::Available | SeatStatus::Unknown => false,
        }
    }

    pub fn available_count(&self) -> usize {
        self.available_seats.len()
    }

    pub fn booked_count(&self) -> usize {
        self.booked_seats.len()
    }

    pub fn temporary_count(&self) -> usize {
        self.temporary_holds.len()
    }

    // 检查三个分区互不重叠，并在已知总座位数时覆盖 1..=total_seats
    pub fn anomalies(&self) -> Vec<SnapshotAnomaly> {
        let mut found = Vec::new();

        for seat in self.booked_seats.intersection(&self.available_seats) {
            found.push(SnapshotAnomaly::BookedAndAvailable(*seat));
        }

        let mut held: Vec<SeatNumber> = self.temporary_holds.keys().copied().collect();
        held.sort_unstable();
        for seat in held {
            if self.booked_seats.contains(&seat) {
                found.push(SnapshotAnomaly::BookedAndHeld(seat));
            }
            if self.available_seats.contains(&seat) {
                found.push(SnapshotAnomaly::HeldAndAvailable(seat));
            }
        }

        if let Some(total) = self.total_seats {
            for seat in 1..=total {
                if !self.booked_seats.contains(&seat)
                    && !self.available_seats.contains(&seat)
                    && !self.temporary_holds.contains_key(&seat)
                {
                    found.push(SnapshotAnomaly::Missing(seat));
                }
            }
        }

        found
    }
}
