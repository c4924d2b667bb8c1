use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{date_or_today, get_optional_str, get_required_str, require_db};
use crate::ipc::types::{AppState, Request};
use crate::model::{format_date, normalize_phone, Student};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;

fn student_json(s: &Student) -> serde_json::Value {
    json!({
        "roll": s.roll,
        "name": s.name,
        "phone": s.phone,
        "parent_name": s.parent_name,
    })
}

fn students_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let students = db::list_students(conn).map_err(HandlerErr::query)?;
    let rows: Vec<serde_json::Value> = students.iter().map(student_json).collect();
    Ok(json!({ "students": rows }))
}

fn students_create(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let (Some(roll), Some(name), Some(raw_phone)) = (
        get_optional_str(params, "roll"),
        get_optional_str(params, "name"),
        get_optional_str(params, "phone"),
    ) else {
        return Err(HandlerErr::bad_params("missing fields").with_details(json!({
            "required": ["roll", "name", "phone"]
        })));
    };
    let phone = normalize_phone(&raw_phone, &state.config.default_country_code)
        .ok_or_else(|| HandlerErr::bad_params("invalid phone number"))?;
    let parent_name = get_optional_str(params, "parentName")
        .or_else(|| get_optional_str(params, "parent_name"))
        .unwrap_or_default();

    if db::student_exists(conn, &roll).map_err(HandlerErr::query)? {
        return Err(
            HandlerErr::new("db_update_failed", format!("roll already exists: {}", roll))
                .with_details(json!({ "table": "students" })),
        );
    }
    let student = Student {
        roll,
        name,
        phone,
        parent_name,
    };
    db::insert_student(conn, &student).map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "students" }))
    })?;
    info!(roll = %student.roll, "student added");
    Ok(json!({ "student": student_json(&student) }))
}

fn students_delete(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let roll = get_required_str(params, "roll")?;
    let removed = db::delete_student(conn, &roll).map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "students" }))
    })?;
    if !removed {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    info!(roll = %roll, "student removed");
    Ok(json!({ "roll": roll }))
}

/// Roster merged with the day's ledger rows. Students without a row show as
/// PRESENT, matching the dashboard's default before anyone is marked.
fn students_today(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let date = date_or_today(params)?;
    let students = db::list_students(conn).map_err(HandlerErr::query)?;
    let by_roll: HashMap<String, db::LedgerRow> = db::attendance_for_date(conn, date)
        .map_err(HandlerErr::query)?
        .into_iter()
        .map(|r| (r.student_roll.clone(), r))
        .collect();

    let rows: Vec<serde_json::Value> = students
        .iter()
        .map(|s| {
            let mut v = student_json(s);
            match by_roll.get(&s.roll) {
                Some(r) => {
                    v["status"] = json!(r.status);
                    v["reason"] = json!(r.reason.clone().unwrap_or_default());
                    v["transcript"] = json!(r.transcript.clone().unwrap_or_default());
                }
                None => {
                    v["status"] = json!("PRESENT");
                    v["reason"] = json!("");
                    v["transcript"] = json!("");
                }
            }
            v
        })
        .collect();
    Ok(json!({ "date": format_date(date), "students": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state),
        "students.create" => students_create(state, &req.params),
        "students.delete" => students_delete(state, &req.params),
        "students.today" => students_today(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
