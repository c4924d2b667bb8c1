use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::Config;
use crate::gateway::HttpCallGateway;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: Config,
    pub gateway: HttpCallGateway,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let gateway = HttpCallGateway::new(&config.gateway);
        Self {
            workspace: None,
            db: None,
            config,
            gateway,
        }
    }
}
