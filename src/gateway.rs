use crate::config::GatewayConfig;
use crate::model::CallRequest;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("call gateway rejected request with http status {status}")]
    Rejected { status: u16 },

    #[error("call gateway transport error: {0}")]
    Transport(String),
}

/// Accepts call-initiation requests. Acceptance says nothing about the call
/// itself; its reason and transcript arrive later through the ledger.
pub trait CallGateway: Sync {
    fn start_call(&self, req: &CallRequest) -> Result<(), CallError>;
}

pub struct HttpCallGateway {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpCallGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build();
        Self {
            endpoint: config.endpoint.clone(),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CallGateway for HttpCallGateway {
    fn start_call(&self, req: &CallRequest) -> Result<(), CallError> {
        let resp = self
            .agent
            .post(&self.endpoint)
            .set("content-type", "application/json")
            .send_json(req);
        match resp {
            Ok(resp) if (200..=299).contains(&resp.status()) => Ok(()),
            Ok(resp) => Err(CallError::Rejected {
                status: resp.status(),
            }),
            Err(ureq::Error::Status(status, _)) => Err(CallError::Rejected { status }),
            Err(ureq::Error::Transport(err)) => Err(CallError::Transport(bounded(err.to_string()))),
        }
    }
}

fn bounded(msg: String) -> String {
    if msg.len() > 256 {
        msg.chars().take(256).collect()
    } else {
        msg
    }
}
