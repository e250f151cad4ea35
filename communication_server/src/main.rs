use std::sync::Arc;

use anyhow::Context;
use communication_server::{serve, HostMapping, ServerConfig};
use local_ip_address::local_ip;
use msgs::{config_file::{config_path_from_args, load_config}, logger::init_logger};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("info");

    let config_path = config_path_from_args();
    let config: ServerConfig = load_config(config_path.as_deref())?;

    let listener = TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("could not bind {}", config.listen_address))?;
    let local_addr = listener.local_addr()?;

    match local_ip() {
        Ok(my_local_ip) => tracing::info!("server started at ip: {my_local_ip}:{}", local_addr.port()),
        Err(_) => tracing::info!("server started at {local_addr}"),
    }

    serve(listener, Arc::new(HostMapping::new())).await
}
