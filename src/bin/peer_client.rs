//! Interactive trading client.
//!
//! Serves forwarded orders and trades on its own HTTP endpoint, heartbeats the router,
//! and reads `buy`/`sell`/`display`/`help`/`exit` commands from stdin.

use log::{info, warn};
use peer_exchange::cli::{render, Command, HELP};
use peer_exchange::transport::http::{endpoint_of, serve};
use peer_exchange::{ClientConfig, ClientNode, HttpTransport};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::try_init();
    let config = ClientConfig::from_env()?;

    let listener = TcpListener::bind(config.socket_addr_string()).await?;
    let endpoint = endpoint_of(&listener)?;
    let port = listener.local_addr()?.port();
    let http = Arc::new(HttpTransport::new(config.rendezvous_url.clone()));
    let node = Arc::new(ClientNode::new(
        config.client_id.clone(),
        config.server_service.clone(),
        http.clone(),
        config.request_timeout,
    ));

    let handler = node.clone();
    tokio::spawn(async move {
        if let Err(e) = serve(listener, handler).await {
            warn!("client server stopped: {}", e);
        }
    });

    // Announce once before registering so the router's first probe can resolve us.
    let id = config.client_id.clone();
    if let Err(e) = http.announce(id.as_str(), &endpoint).await {
        warn!("announce failed client={}: {}", id, e);
    }
    let announcer = http.clone();
    let announce_every = config.announce_interval;
    let announced = endpoint.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(announce_every);
        loop {
            ticker.tick().await;
            if let Err(e) = announcer.announce(id.as_str(), &announced).await {
                warn!("announce failed client={}: {}", id, e);
            }
        }
    });

    match node.register(port).await {
        Ok(reply) => info!("registered client={} reply={}", node.id(), reply.msg),
        Err(e) => warn!("Error registering client {}: {}", node.id(), e),
    }
    tokio::spawn(node.clone().run_heartbeat(config.heartbeat_interval));

    println!("Client {} started at {}", node.id(), endpoint);
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Command::Order { side, amount, price }) => match node.submit(side, amount, price).await {
                Ok(order) => println!("Order added: {} {:?} {} @ {}", order.order_id, side, amount, price),
                Err(e) => println!("{}", e),
            },
            Ok(Command::Display) => print!("{}", render(&node.book(), &node.trades())),
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Exit) => break,
            Ok(Command::Nothing) => {}
            Err(e) => println!("{}", e),
        }
    }
    info!("client exiting client={}", node.id());
    Ok(())
}
