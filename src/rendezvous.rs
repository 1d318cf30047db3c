//! Rendezvous service: maps service names to endpoints.
//!
//! Nodes announce `(service, endpoint)` periodically and peers look names up before
//! sending. Endpoints: `GET /health`, `POST /announce`, `GET /lookup/:service`.

use crate::error::PeerError;
use crate::transport::Endpoint;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Default lifetime of an announcement that is not refreshed.
pub const DEFAULT_ANNOUNCE_TTL: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
struct Announced {
    endpoint: Endpoint,
    at: Instant,
}

/// In-memory name table. A mapping expires `ttl` after its last announce.
#[derive(Clone)]
pub struct Directory {
    entries: Arc<RwLock<HashMap<String, Announced>>>,
    ttl: Duration,
}

impl Default for Directory {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_ANNOUNCE_TTL)
    }
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::default(),
            ttl,
        }
    }

    /// Record or refresh `endpoint` for `service`, dropping expired mappings.
    /// Returns true if the mapping is new, changed, or had expired.
    pub fn announce(&self, service: &str, endpoint: Endpoint) -> bool {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        let previous = entries
            .get(service)
            .filter(|a| now.duration_since(a.at) < ttl)
            .map(|a| a.endpoint.clone());
        entries.retain(|_, a| now.duration_since(a.at) < ttl);
        entries.insert(
            service.to_string(),
            Announced {
                endpoint: endpoint.clone(),
                at: now,
            },
        );
        previous != Some(endpoint)
    }

    /// Endpoint for `service` if it was announced within the ttl.
    pub fn lookup(&self, service: &str) -> Option<Endpoint> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries
            .get(service)
            .filter(|a| a.at.elapsed() < self.ttl)
            .map(|a| a.endpoint.clone())
    }

    /// Number of live mappings.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.values().filter(|a| a.at.elapsed() < self.ttl).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Announcement {
    pub service: String,
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct LookupResponse {
    endpoint: Endpoint,
}

/// Builds the rendezvous router over `directory`.
pub fn create_router(directory: Directory) -> Router<()> {
    Router::new()
        .route("/health", get(health))
        .route("/announce", post(announce))
        .route("/lookup/:service", get(lookup))
        .layer(Extension(directory))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn announce(Extension(directory): Extension<Directory>, Json(body): Json<Announcement>) -> Response {
    if directory.announce(&body.service, body.endpoint.clone()) {
        info!("service announced service={} endpoint={}", body.service, body.endpoint);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn lookup(Extension(directory): Extension<Directory>, Path(service): Path<String>) -> Response {
    match directory.lookup(&service) {
        Some(endpoint) => (StatusCode::OK, Json(LookupResponse { endpoint })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown service {}", service) })),
        )
            .into_response(),
    }
}

/// HTTP client for a rendezvous service at `base_url` (e.g. `http://127.0.0.1:30001`).
#[derive(Clone, Debug)]
pub struct RendezvousClient {
    base_url: String,
    http: reqwest::Client,
}

impl RendezvousClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub async fn announce(&self, service: &str, endpoint: &Endpoint, timeout: Duration) -> Result<(), PeerError> {
        let url = format!("{}/announce", self.base_url);
        let body = Announcement {
            service: service.to_string(),
            endpoint: endpoint.clone(),
        };
        self.http
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| request_error(&self.base_url, timeout, e))?;
        Ok(())
    }

    pub async fn lookup(&self, service: &str, timeout: Duration) -> Result<Endpoint, PeerError> {
        let url = format!("{}/lookup/{}", self.base_url, service);
        let response = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(&self.base_url, timeout, e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PeerError::Unresolved(service.to_string()));
        }
        let body: LookupResponse = response
            .error_for_status()
            .map_err(|e| request_error(&self.base_url, timeout, e))?
            .json()
            .await
            .map_err(|e| request_error(&self.base_url, timeout, e))?;
        Ok(body.endpoint)
    }
}

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn request_error(endpoint: &str, timeout: Duration, e: reqwest::Error) -> PeerError {
    if e.is_timeout() {
        PeerError::Timeout {
            endpoint: endpoint.to_string(),
            after: timeout,
        }
    } else {
        PeerError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}
