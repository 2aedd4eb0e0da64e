// ====================================================================================
// src/config.rs - 配置管理
// ====================================================================================
use crate::error::{AppError, AppResult};
use crate::models::{ScheduleId, UserId};
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub schedule_id: ScheduleId,
    pub current_user_id: UserId,
    pub current_username: String,

    // Django 的 CSRF/会话凭据
    pub csrf_token: Option<String>,
    pub session_id: Option<String>,

    pub max_seats: usize,
    pub poll_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub seats_per_row: u32,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        // 尝试加载 .env 文件，如果失败则忽略（可能文件不存在）
        if let Err(e) = dotenvy::dotenv() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            api_base_url: lookup("BOOKING_API_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8000/api".to_string()),
            schedule_id: required(&lookup, "SCHEDULE_ID")?,
            current_user_id: required(&lookup, "CURRENT_USER_ID")?,
            current_username: lookup("CURRENT_USERNAME").unwrap_or_default(),
            csrf_token: lookup("CSRF_TOKEN").filter(|v| !v.is_empty()),
            session_id: lookup("SESSION_ID").filter(|v| !v.is_empty()),
            max_seats: parsed_or(&lookup, "MAX_SEATS", 4)?,
            poll_interval_seconds: parsed_or(&lookup, "POLL_INTERVAL_SECONDS", 5)?,
            request_timeout_seconds: parsed_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 10)?,
            seats_per_row: parsed_or(&lookup, "SEATS_PER_ROW", 4)?,
        };

        if config.max_seats == 0 {
            return Err(AppError::Config("MAX_SEATS must be at least 1".to_string()));
        }
        if config.poll_interval_seconds == 0 {
            return Err(AppError::Config("POLL_INTERVAL_SECONDS must be at least 1".to_string()));
        }

        Ok(config)
    }
}

fn required<F, T>(lookup: &F, key: &str) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key).ok_or_else(|| AppError::Config(format!("{} must be set", key)))?;
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a valid number", key)))
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", key))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[("SCHEDULE_ID", "12"), ("CURRENT_USER_ID", "7")])).unwrap();
        assert_eq!(config.schedule_id, 12);
        assert_eq!(config.current_user_id, 7);
        assert_eq!(config.max_seats, 4);
        assert_eq!(config.poll_interval_seconds, 5);
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000/api");
        assert!(config.csrf_token.is_none());
    }

    #[test]
    fn missing_schedule_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("CURRENT_USER_ID", "7")])).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("SCHEDULE_ID")));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("SCHEDULE_ID", "12"),
            ("CURRENT_USER_ID", "7"),
            ("MAX_SEATS", "four"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("MAX_SEATS")));

        let err = Config::from_lookup(lookup_from(&[
            ("SCHEDULE_ID", "12"),
            ("CURRENT_USER_ID", "7"),
            ("MAX_SEATS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
