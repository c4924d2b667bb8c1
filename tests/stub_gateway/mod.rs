//! Minimal HTTP/1.1 stand-in for the call gateway's `POST /start-call`.
#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

pub struct StubGateway {
    pub url: String,
    hits: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl StubGateway {
    /// Accepts every call except those whose roll is in `reject_rolls`,
    /// which get a 500.
    pub fn start(reject_rolls: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub gateway");
        let addr = listener.local_addr().expect("stub addr");
        let reject: Arc<HashSet<String>> =
            Arc::new(reject_rolls.iter().map(|s| s.to_string()).collect());
        let hits = Arc::new(Mutex::new(Vec::new()));

        let hits_bg = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let hits = Arc::clone(&hits_bg);
                let reject = Arc::clone(&reject);
                thread::spawn(move || serve_one(stream, &hits, &reject));
            }
        });

        Self {
            url: format!("http://{}/start-call", addr),
            hits,
        }
    }

    /// Rolls received so far, sorted.
    pub fn rolls(&self) -> Vec<String> {
        let mut v: Vec<String> = self
            .hits
            .lock()
            .expect("hits lock")
            .iter()
            .filter_map(|b| b.get("roll").and_then(|r| r.as_str()).map(str::to_string))
            .collect();
        v.sort();
        v
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.hits.lock().expect("hits lock").clone()
    }
}

fn serve_one(stream: TcpStream, hits: &Mutex<Vec<serde_json::Value>>, reject: &HashSet<String>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut content_length = 0usize;
    let mut chunked = false;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let t = line.trim_end();
        if t.is_empty() {
            break;
        }
        if let Some((name, value)) = t.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            } else if name == "transfer-encoding" && value.eq_ignore_ascii_case("chunked") {
                chunked = true;
            }
        }
    }

    let body = if chunked {
        read_chunked(&mut reader)
    } else {
        let mut buf = vec![0u8; content_length];
        if reader.read_exact(&mut buf).is_err() {
            return;
        }
        buf
    };
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    let roll = parsed
        .get("roll")
        .and_then(|r| r.as_str())
        .unwrap_or("")
        .to_string();
    hits.lock().expect("hits lock").push(parsed);

    let (status, payload) = if reject.contains(&roll) {
        ("500 Internal Server Error", "{\"error\":\"twilio unavailable\"}")
    } else {
        ("200 OK", "{\"status\":\"success\",\"call_sid\":\"CA-stub\"}")
    };
    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    let _ = stream.flush();
}

fn read_chunked(reader: &mut BufReader<TcpStream>) -> Vec<u8> {
    let mut body = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let size = usize::from_str_radix(line.trim(), 16).unwrap_or(0);
        if size == 0 {
            line.clear();
            let _ = reader.read_line(&mut line);
            break;
        }
        let mut chunk = vec![0u8; size + 2];
        if reader.read_exact(&mut chunk).is_err() {
            break;
        }
        chunk.truncate(size);
        body.extend_from_slice(&chunk);
    }
    body
}
