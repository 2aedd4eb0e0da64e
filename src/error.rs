// ====================================================================================
// src/error.rs - 自定义错误类型
// ====================================================================================
use crate::models::SeatNumber;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

// 错误分类: 决定调用方如何处理 (提示用户 / 强制刷新 / 等待下一次轮询)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Validation,
    Conflict,
    Config,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("You can select at most {max_seats} seats")]
    SelectionLimit { max_seats: usize },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Seats {} are no longer available", format_seats(.0))]
    SeatsUnavailable(Vec<SeatNumber>),
    #[error("A booking is already being submitted")]
    Busy,
    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Reqwest(_) => ErrorKind::Transport,
            // 4xx 是服务端拒绝(座位被占等)，5xx 视为传输故障
            AppError::Server { status, .. } if *status >= 500 => ErrorKind::Transport,
            AppError::Server { .. } => ErrorKind::Conflict,
            AppError::Validation(_) | AppError::SelectionLimit { .. } => ErrorKind::Validation,
            AppError::Conflict(_) | AppError::SeatsUnavailable(_) | AppError::Busy => {
                ErrorKind::Conflict
            }
            AppError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    // 展示给用户的文本，优先使用服务端给出的原因
    pub fn user_message(&self) -> String {
        match self {
            AppError::Reqwest(_) => "Could not reach the booking server. Please try again.".to_string(),
            AppError::Server { message, .. } => message.clone(),
            AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

fn format_seats(seats: &[SeatNumber]) -> String {
    seats
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
