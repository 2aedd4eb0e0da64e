// ====================================================================================
// src/lib.rs - 订座页面客户端
// ====================================================================================
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod page;
pub mod render;
pub mod selection;
pub mod snapshot;
pub mod sync;
pub mod view;

pub use error::{AppError, AppResult, ErrorKind};
