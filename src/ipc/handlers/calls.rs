use crate::gateway::CallGateway;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{normalize_phone, CallRequest};
use serde_json::json;
use tracing::{info, warn};

/// One-off call used to check the gateway wiring; touches no ledger row.
fn calls_start(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw_phone = get_required_str(params, "phone")?;
    let phone = normalize_phone(&raw_phone, &state.config.default_country_code)
        .ok_or_else(|| HandlerErr::bad_params("invalid phone number"))?;
    let roll = get_optional_str(params, "roll").unwrap_or_else(|| "TEST".to_string());
    let req = CallRequest { phone, roll };

    match state.gateway.start_call(&req) {
        Ok(()) => {
            info!(roll = %req.roll, "test call accepted");
            Ok(json!({ "accepted": true, "phone": req.phone, "roll": req.roll }))
        }
        Err(e) => {
            warn!(roll = %req.roll, error = %e, "test call failed");
            Err(HandlerErr::new("call_failed", e.to_string())
                .with_details(json!({ "endpoint": state.gateway.endpoint() })))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "calls.start" => calls_start(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
