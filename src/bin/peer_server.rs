//! Router server: peer registry, liveness prober, and order/trade fan-out over HTTP.
//!
//! Config from env (see `peer_exchange::config`). Needs a running `rendezvous`.

use log::{info, warn};
use peer_exchange::transport::http::{endpoint_of, serve};
use peer_exchange::{HttpTransport, MessageRouter, PeerRegistry, PeerTransport, Prober, ServerConfig};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::try_init();
    let config = ServerConfig::from_env()?;

    let listener = TcpListener::bind(config.socket_addr_string()).await?;
    let endpoint = endpoint_of(&listener)?;
    let http = Arc::new(HttpTransport::new(config.rendezvous_url.clone()));
    let transport: Arc<dyn PeerTransport> = http.clone();

    let registry = Arc::new(PeerRegistry::new());
    let router = Arc::new(MessageRouter::new(registry.clone(), transport.clone(), config.forward_timeout));
    let prober = Prober::new(registry, transport, config.probe_interval, config.probe_timeout);
    tokio::spawn(prober.run());

    let service = config.service_name.clone();
    let announce_every = config.announce_interval;
    let announced = endpoint.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(announce_every);
        loop {
            ticker.tick().await;
            if let Err(e) = http.announce(&service, &announced).await {
                warn!("announce failed service={}: {}", service, e);
            }
        }
    });

    info!(
        "router listening service={} endpoint={} rendezvous={}",
        config.service_name, endpoint, config.rendezvous_url
    );
    serve(listener, router).await?;
    Ok(())
}
