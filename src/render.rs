// ====================================================================================
// src/render.rs - 座位渲染: 快照 -> 每个座位的显示状态
// ====================================================================================
use crate::models::{SeatNumber, UserId};
use crate::snapshot::{SeatSnapshot, SeatStatus};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatState {
    Booked,
    HeldByOther { holder_name: String, countdown: String },
    HeldByMe { countdown: String },
    Available,
    Unknown,
}

// 绘制一个座位元素所需的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRender {
    pub seat: SeatNumber,
    pub name: String,
    pub state: SeatState,
    pub interactive: bool,
    pub label: String,
}

impl SeatRender {
    pub fn css_class(&self) -> &'static str {
        match self.state {
            SeatState::Booked => "seat-booked",
            SeatState::HeldByOther { .. } => "seat-temporary",
            SeatState::HeldByMe { .. } => "seat-selected",
            SeatState::Available => "seat-available",
            SeatState::Unknown => "seat-unknown",
        }
    }
}

// 向上取整到分钟; <= 0 显示 expired
pub fn format_countdown(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining_ms = (expires_at - now).num_milliseconds();
    if remaining_ms <= 0 {
        return "expired".to_string();
    }
    let minutes = (remaining_ms + 59_999) / 60_000;
    if minutes == 1 {
        "1 min".to_string()
    } else {
        format!("{} mins", minutes)
    }
}

// 1 -> A1, 5 -> B1 (每排 seats_per_row 个座位)
pub fn seat_name(seat: SeatNumber, seats_per_row: u32) -> String {
    if seat == 0 || seats_per_row == 0 {
        return seat.to_string();
    }
    let row = (seat - 1) / seats_per_row;
    let col = (seat - 1) % seats_per_row + 1;
    match char::from_u32('A' as u32 + row) {
        Some(letter) if row < 26 => format!("{}{}", letter, col),
        _ => seat.to_string(),
    }
}

fn expiry_text(countdown: &str) -> String {
    if countdown == "expired" {
        "expired".to_string()
    } else {
        format!("expires in {}", countdown)
    }
}

pub fn render_seat(
    snapshot: &SeatSnapshot,
    seat: SeatNumber,
    current_user: UserId,
    now: DateTime<Utc>,
    seats_per_row: u32,
) -> SeatRender {
    let name = seat_name(seat, seats_per_row);
    let (state, interactive, label) = match snapshot.status(seat) {
        SeatStatus::Booked => (SeatState::Booked, false, format!("Seat {} is booked", name)),
        SeatStatus::Held(hold) => {
            let countdown = format_countdown(hold.expires_at, now);
            if hold.holder_id == current_user {
                let label = format!("Selected by you ({})", expiry_text(&countdown));
                (SeatState::HeldByMe { countdown }, true, label)
            } else {
                let label = format!(
                    "Temporarily selected by {} ({})",
                    hold.holder_name,
                    expiry_text(&countdown)
                );
                let state = SeatState::HeldByOther {
                    holder_name: hold.holder_name.clone(),
                    countdown,
                };
                (state, false, label)
            }
        }
        SeatStatus::Available => (SeatState::Available, true, format!("Seat {} is available", name)),
        SeatStatus::Unknown => (SeatState::Unknown, false, format!("Seat {} status unknown", name)),
    };

    SeatRender { seat, name, state, interactive, label }
}

pub fn render_all(
    snapshot: &SeatSnapshot,
    seats: &[SeatNumber],
    current_user: UserId,
    now: DateTime<Utc>,
    seats_per_row: u32,
) -> Vec<SeatRender> {
    seats
        .iter()
        .map(|seat| render_seat(snapshot, *seat, current_user, now, seats_per_row))
        .collect()
}
