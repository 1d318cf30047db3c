//! Name directory the server and clients announce themselves on.

use log::info;
use peer_exchange::rendezvous::{create_router, Directory};
use peer_exchange::RendezvousConfig;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::try_init();
    let config = RendezvousConfig::from_env()?;
    let listener = TcpListener::bind(config.socket_addr_string()).await?;
    info!(
        "rendezvous listening on http://{} ttl={:?}",
        listener.local_addr()?,
        config.announce_ttl
    );
    let directory = Directory::with_ttl(config.announce_ttl);
    axum::serve(listener, create_router(directory).into_make_service()).await?;
    Ok(())
}
