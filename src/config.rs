use std::env;

pub const CALL_GATEWAY_URL_DEFAULT: &str = "http://localhost:8000/start-call";
pub const CALL_CONNECT_TIMEOUT_MS_DEFAULT: u64 = 2_000;
pub const CALL_TIMEOUT_MS_DEFAULT: u64 = 5_000;
pub const CALL_MAX_IN_FLIGHT_DEFAULT: usize = 16;
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

/// Settings for reaching the external call gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    /// Upper bound on a single call-initiation request, connect included.
    pub request_timeout_ms: u64,
    pub max_in_flight: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: CALL_GATEWAY_URL_DEFAULT.to_string(),
            connect_timeout_ms: CALL_CONNECT_TIMEOUT_MS_DEFAULT,
            request_timeout_ms: CALL_TIMEOUT_MS_DEFAULT,
            max_in_flight: CALL_MAX_IN_FLIGHT_DEFAULT,
        }
    }
}

impl GatewayConfig {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let endpoint = lookup("ROLLCALL_CALL_GATEWAY_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| CALL_GATEWAY_URL_DEFAULT.to_string());
        let connect_timeout_ms = lookup("ROLLCALL_CALL_CONNECT_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| (100..=30_000).contains(v))
            .unwrap_or(CALL_CONNECT_TIMEOUT_MS_DEFAULT);
        let request_timeout_ms = lookup("ROLLCALL_CALL_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| (100..=60_000).contains(v))
            .unwrap_or(CALL_TIMEOUT_MS_DEFAULT);
        let max_in_flight = lookup("ROLLCALL_CALL_MAX_IN_FLIGHT")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| (1..=256).contains(v))
            .unwrap_or(CALL_MAX_IN_FLIGHT_DEFAULT);
        Self {
            endpoint,
            connect_timeout_ms,
            request_timeout_ms,
            max_in_flight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub default_country_code: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_country_code = lookup("ROLLCALL_DEFAULT_COUNTRY_CODE")
            .map(|v| v.trim().to_string())
            .filter(|v| v.starts_with('+') && v.len() > 1)
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());
        Self {
            gateway: GatewayConfig::from_lookup(&lookup),
            default_country_code,
        }
    }
}
