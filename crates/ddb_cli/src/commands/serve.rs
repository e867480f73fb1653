//! Serve command implementation.

use ddb_core::StoreConfig;
use ddb_server::{HttpServer, ServerConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tracing::info;

/// Runs the serve command until Ctrl-C.
pub fn run(
    path: &Path,
    host: &str,
    port: u16,
    max_body_size: Option<usize>,
    sync_on_write: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ip: IpAddr = host
        .parse()
        .map_err(|e| format!("Invalid host {host:?}: {e}"))?;

    let mut config = ServerConfig::new(SocketAddr::new(ip, port)).with_store(
        StoreConfig::new()
            .path(path)
            .sync_on_write(sync_on_write),
    );
    if let Some(size) = max_body_size {
        config = config.with_max_body_size(size);
    }

    let server = HttpServer::new(config)?;
    println!("Serving {:?} on http://{}", path, server.config().bind_addr);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.start_with_shutdown(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
    }))?;

    Ok(())
}
