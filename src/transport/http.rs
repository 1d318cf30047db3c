//! JSON-over-HTTP transport.
//!
//! Outbound requests are `POST {endpoint}/rpc` through reqwest with a per-call
//! timeout; names resolve through a [`RendezvousClient`]. [`serve`] exposes a
//! [`MessageHandler`] on `POST /rpc` with axum.

use super::{dispatch, Endpoint, MessageHandler, PeerTransport};
use crate::error::PeerError;
use crate::protocol::{Message, Reply};
use crate::rendezvous::{request_error, RendezvousClient};
use async_trait::async_trait;
use axum::{extract::Extension, routing::post, Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// HTTP peer transport backed by one shared reqwest connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    rendezvous: RendezvousClient,
    lookup_timeout: Duration,
}

impl HttpTransport {
    pub fn new(rendezvous_url: impl Into<String>) -> Self {
        let http = reqwest::Client::new();
        Self {
            rendezvous: RendezvousClient::new(rendezvous_url, http.clone()),
            http,
            lookup_timeout: Duration::from_secs(2),
        }
    }

    /// Publish `endpoint` under `service` on the rendezvous.
    pub async fn announce(&self, service: &str, endpoint: &Endpoint) -> Result<(), PeerError> {
        self.rendezvous.announce(service, endpoint, self.lookup_timeout).await
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn resolve(&self, service: &str) -> Result<Endpoint, PeerError> {
        self.rendezvous.lookup(service, self.lookup_timeout).await
    }

    async fn request(
        &self,
        endpoint: &Endpoint,
        message: &Message,
        timeout: Duration,
    ) -> Result<Reply, PeerError> {
        let url = format!("{}/rpc", endpoint.0.trim_end_matches('/'));
        self.http
            .post(&url)
            .timeout(timeout)
            .json(message)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| request_error(&endpoint.0, timeout, e))?
            .json::<Reply>()
            .await
            .map_err(|e| request_error(&endpoint.0, timeout, e))
    }
}

/// Router exposing `handler` on `POST /rpc`.
pub fn create_router(handler: Arc<dyn MessageHandler>) -> Router<()> {
    Router::new()
        .route("/rpc", post(rpc))
        .route("/health", axum::routing::get(|| async { "ok" }))
        .layer(Extension(handler))
}

async fn rpc(
    Extension(handler): Extension<Arc<dyn MessageHandler>>,
    Json(payload): Json<serde_json::Value>,
) -> Json<Reply> {
    Json(dispatch(handler.as_ref(), payload).await)
}

/// Serve `handler` on `listener` until the server stops.
pub async fn serve(listener: TcpListener, handler: Arc<dyn MessageHandler>) -> std::io::Result<()> {
    axum::serve(listener, create_router(handler).into_make_service()).await
}

/// `http://addr` endpoint for a bound listener.
pub fn endpoint_of(listener: &TcpListener) -> std::io::Result<Endpoint> {
    Ok(Endpoint(format!("http://{}", listener.local_addr()?)))
}
