//! Node configuration read from environment variables, with defaults.
//!
//! - Server: `SERVER_BIND`, `SERVER_PORT`, `SERVICE_NAME`, `RENDEZVOUS_URL`,
//!   `PROBE_INTERVAL_MS`, `PROBE_TIMEOUT_MS`, `FORWARD_TIMEOUT_MS`, `ANNOUNCE_INTERVAL_MS`
//! - Client: `CLIENT_ID`, `CLIENT_BIND`, `CLIENT_PORT`, `SERVICE_NAME`, `RENDEZVOUS_URL`,
//!   `HEARTBEAT_INTERVAL_MS`, `REQUEST_TIMEOUT_MS`, `ANNOUNCE_INTERVAL_MS`
//! - Rendezvous: `RENDEZVOUS_BIND`, `RENDEZVOUS_PORT`, `ANNOUNCE_TTL_MS`

use crate::error::ConfigError;
use crate::rendezvous::DEFAULT_ANNOUNCE_TTL;
use crate::types::{now_millis, ClientId};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SERVICE_NAME: &str = "rpc_test";
pub const DEFAULT_RENDEZVOUS_URL: &str = "http://127.0.0.1:30001";

/// Router/registry server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Name the router announces on the rendezvous; clients send to it.
    pub service_name: String,
    pub rendezvous_url: String,
    /// Period of the liveness loop.
    pub probe_interval: Duration,
    /// Budget for a single liveness probe.
    pub probe_timeout: Duration,
    /// Budget for a single order/trade forward.
    pub forward_timeout: Duration,
    pub announce_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 1040,
            service_name: DEFAULT_SERVICE_NAME.into(),
            rendezvous_url: DEFAULT_RENDEZVOUS_URL.into(),
            probe_interval: Duration::from_millis(1000),
            probe_timeout: Duration::from_millis(500),
            forward_timeout: Duration::from_millis(10_000),
            announce_interval: Duration::from_millis(1000),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production, a map in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            bind_addr: get("SERVER_BIND").unwrap_or(d.bind_addr),
            port: parse_or(&get, "SERVER_PORT", d.port)?,
            service_name: get("SERVICE_NAME").unwrap_or(d.service_name),
            rendezvous_url: get("RENDEZVOUS_URL").unwrap_or(d.rendezvous_url),
            probe_interval: millis_or(&get, "PROBE_INTERVAL_MS", d.probe_interval)?,
            probe_timeout: millis_or(&get, "PROBE_TIMEOUT_MS", d.probe_timeout)?,
            forward_timeout: millis_or(&get, "FORWARD_TIMEOUT_MS", d.forward_timeout)?,
            announce_interval: millis_or(&get, "ANNOUNCE_INTERVAL_MS", d.announce_interval)?,
        })
    }

    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Client node settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: ClientId,
    pub bind_addr: String,
    /// 0 picks an ephemeral port.
    pub port: u16,
    /// Router service to send to.
    pub server_service: String,
    pub rendezvous_url: String,
    pub heartbeat_interval: Duration,
    pub request_timeout: Duration,
    pub announce_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: ClientId(format!("client_{}", now_millis())),
            bind_addr: "127.0.0.1".into(),
            port: 0,
            server_service: DEFAULT_SERVICE_NAME.into(),
            rendezvous_url: DEFAULT_RENDEZVOUS_URL.into(),
            heartbeat_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(10_000),
            announce_interval: Duration::from_millis(1000),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            client_id: get("CLIENT_ID").map(ClientId).unwrap_or(d.client_id),
            bind_addr: get("CLIENT_BIND").unwrap_or(d.bind_addr),
            port: parse_or(&get, "CLIENT_PORT", d.port)?,
            server_service: get("SERVICE_NAME").unwrap_or(d.server_service),
            rendezvous_url: get("RENDEZVOUS_URL").unwrap_or(d.rendezvous_url),
            heartbeat_interval: millis_or(&get, "HEARTBEAT_INTERVAL_MS", d.heartbeat_interval)?,
            request_timeout: millis_or(&get, "REQUEST_TIMEOUT_MS", d.request_timeout)?,
            announce_interval: millis_or(&get, "ANNOUNCE_INTERVAL_MS", d.announce_interval)?,
        })
    }

    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Rendezvous service settings.
#[derive(Debug, Clone)]
pub struct RendezvousConfig {
    pub bind_addr: String,
    pub port: u16,
    /// How long an announcement lives without a refresh.
    pub announce_ttl: Duration,
}

impl RendezvousConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: get("RENDEZVOUS_BIND").unwrap_or_else(|| "127.0.0.1".into()),
            port: parse_or(&get, "RENDEZVOUS_PORT", 30001u16)?,
            announce_ttl: millis_or(&get, "ANNOUNCE_TTL_MS", DEFAULT_ANNOUNCE_TTL)?,
        })
    }

    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError {
                key: key.to_string(),
                reason: e.to_string(),
                value,
            })
        }
        None => Ok(default),
    }
}

fn millis_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let ms = parse_or(get, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}
