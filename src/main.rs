//! # HTTP Pool Server - Entry Point
//! src/main.rs
//!
//! ```bash
//! ./server <port> <threads> <queue_size> [--public-dir DIR]
//! ```

use http_pool_server::config::Config;
use http_pool_server::handler::HttpHandler;
use http_pool_server::server::Server;
use tracing::{error, info};

fn main() {
    let config = Config::new();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    config.print_summary();

    let handler = HttpHandler::new(&config.public_dir);
    let server = match Server::bind(&config, handler) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %server.local_addr(),
        workers = config.threads,
        queue_size = config.queue_size,
        "server listening"
    );

    // Sin manejo de señales: el proceso corre hasta que lo terminen
    let report = server.run();
    info!(total_requests = report.total_requests, "server stopped");
}
