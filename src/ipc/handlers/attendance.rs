use crate::db::{self, LedgerRow, SqliteStore};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{date_or_today, get_required_str, require_db};
use crate::ipc::types::{AppState, Request};
use crate::model::format_date;
use crate::submit::Submission;
use crate::transcript::parse_turns;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;

const HISTORY_LIMIT_DEFAULT: usize = 50;
const HISTORY_LIMIT_MAX: usize = 500;

fn ledger_row_json(r: &LedgerRow) -> serde_json::Value {
    let student = match &r.student_name {
        Some(name) => json!({
            "name": name,
            "parent_name": r.parent_name.clone().unwrap_or_default(),
        }),
        None => serde_json::Value::Null,
    };
    json!({
        "id": r.id,
        "student_roll": r.student_roll,
        "date": r.date,
        "status": r.status,
        "reason": r.reason,
        "transcript": r.transcript,
        "students": student,
    })
}

fn parse_present_rolls(params: &serde_json::Value) -> Result<HashSet<String>, HandlerErr> {
    let Some(list) = params
        .get("present_students")
        .or_else(|| params.get("presentStudents"))
        .and_then(|v| v.as_array())
    else {
        return Err(HandlerErr::bad_params("missing present_students"));
    };
    list.iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| HandlerErr::bad_params("present_students must be a list of rolls"))
        })
        .collect()
}

fn attendance_submit(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let present = parse_present_rolls(params)?;
    let date = date_or_today(params)?;
    info!(date = %format_date(date), present = present.len(), "attendance submission received");

    let store = SqliteStore::new(conn);
    let submission = Submission {
        roster: &store,
        ledger: &store,
        gateway: &state.gateway,
        max_in_flight: state.config.gateway.max_in_flight,
    };
    let outcome = submission.submit(&present, date).map_err(|e| {
        HandlerErr::new(e.code(), e.to_string()).with_details(json!({
            "date": format_date(date),
            "table": "attendance",
        }))
    })?;

    let mut result = serde_json::to_value(&outcome)
        .map_err(|e| HandlerErr::new("internal_error", e.to_string()))?;
    result["success"] = json!(true);
    result["date"] = json!(format_date(date));
    Ok(result)
}

fn attendance_log(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let date = date_or_today(params)?;
    let rows = db::attendance_for_date(conn, date).map_err(HandlerErr::query)?;
    let rows_json: Vec<serde_json::Value> = rows.iter().map(ledger_row_json).collect();
    Ok(json!({ "date": format_date(date), "rows": rows_json }))
}

fn attendance_history(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let limit = match params.get("limit") {
        None | Some(serde_json::Value::Null) => HISTORY_LIMIT_DEFAULT,
        Some(v) => v
            .as_u64()
            .map(|n| (n as usize).clamp(1, HISTORY_LIMIT_MAX))
            .ok_or_else(|| HandlerErr::bad_params("limit must be a positive integer"))?,
    };
    let rows = db::attendance_history(conn, limit).map_err(HandlerErr::query)?;
    let rows_json: Vec<serde_json::Value> = rows.iter().map(ledger_row_json).collect();
    Ok(json!({ "rows": rows_json }))
}

/// Write-back from the call gateway: fills in reason and transcript on an
/// existing row without touching its status.
fn attendance_record_call_result(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let roll = get_required_str(params, "roll")?;
    let date = date_or_today(params)?;
    let reason = params
        .get("reason")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params("missing reason"))?;
    let transcript = match params.get("transcript") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| HandlerErr::bad_params("transcript must be string or null"))?,
        ),
    };

    let updated = db::record_call_result(conn, &roll, date, &reason, transcript).map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "attendance" }))
    })?;
    if !updated {
        return Err(HandlerErr::new(
            "not_found",
            "no attendance row for roll on that date",
        )
        .with_details(json!({ "roll": roll, "date": format_date(date) })));
    }
    info!(roll = %roll, date = %format_date(date), "call result recorded");
    Ok(json!({ "roll": roll, "date": format_date(date) }))
}

fn attendance_transcript(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let roll = get_required_str(params, "roll")?;
    let date = date_or_today(params)?;
    let Some(row) = db::attendance_row(conn, &roll, date).map_err(HandlerErr::query)? else {
        return Err(HandlerErr::new("not_found", "attendance row not found"));
    };
    let turns = parse_turns(row.transcript.as_deref().unwrap_or(""));
    Ok(json!({
        "roll": roll,
        "date": format_date(date),
        "studentName": row.student_name,
        "reason": row.reason,
        "turns": turns,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.submit" => attendance_submit(state, &req.params),
        "attendance.log" => attendance_log(state, &req.params),
        "attendance.history" => attendance_history(state, &req.params),
        "attendance.recordCallResult" => attendance_record_call_result(state, &req.params),
        "attendance.transcript" => attendance_transcript(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
