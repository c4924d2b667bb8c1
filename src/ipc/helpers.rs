use crate::ipc::error::HandlerErr;
use crate::model::parse_date;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use super::types::AppState;

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `params.date` as YYYY-MM-DD, or today's UTC calendar day when absent.
pub fn date_or_today(params: &serde_json::Value) -> Result<NaiveDate, HandlerErr> {
    match params.get("date") {
        None | Some(serde_json::Value::Null) => Ok(Utc::now().date_naive()),
        Some(v) => v
            .as_str()
            .and_then(parse_date)
            .ok_or_else(|| HandlerErr::bad_params("date must be YYYY-MM-DD")),
    }
}
