mod config;
mod db;
mod dispatch;
mod gateway;
mod ipc;
mod model;
mod reconcile;
mod submit;
mod telemetry;
mod transcript;

use std::io::{self, BufRead, Write};
use tracing::{info, warn};

fn main() {
    telemetry::init();
    let config = config::Config::from_env();
    info!(
        gateway = %config.gateway.endpoint,
        timeout_ms = config.gateway.request_timeout_ms,
        max_in_flight = config.gateway.max_in_flight,
        "rollcalld starting"
    );
    let mut state = ipc::AppState::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; answer anonymously.
                warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, rollcalld exiting");
}
