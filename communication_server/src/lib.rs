//! Relay between one game master and many agents.

use std::sync::Arc;

use tokio::net::TcpListener;

pub mod client_db;
pub mod config;
pub mod error;
pub mod host_mapping;
pub mod router;

pub use config::ServerConfig;
pub use error::ConnectionError;
pub use host_mapping::{HostMapping, GAME_MASTER_HOST_ID};

use client_db::ClientDb;

/// Accepts connections until the listener fails.
pub async fn serve(listener: TcpListener, mapping: Arc<HostMapping>) -> anyhow::Result<()> {
    let mut client_db = ClientDb::new(mapping);

    loop {
        let (socket, addr) = listener.accept().await?;
        client_db.new_client(socket, addr);
    }
}
