//! `switchyard`: demo server for the component middleware.
//!
//! # Quick start
//!
//! ```sh
//! # Built-in components at /components, no auth:
//! switchyard
//!
//! # With Basic auth and a custom prefix:
//! SWITCHYARD_USER=bot SWITCHYARD_PASS=s3cret SWITCHYARD_PREFIX=/bot switchyard
//! ```
//!
//! # Environment variables
//!
//! See [`switchyard::ServerConfig`] for the full list.

use switchyard::{build_app, builtin, ServerConfig};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchyard=info,tower_http=debug".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration: {e}");
            std::process::exit(1);
        }
    };

    let app = build_app(&config, builtin::catalogue()).layer(TraceLayer::new_for_http());

    tracing::info!(
        "listening on {} (components at {})",
        config.bind_addr,
        config.prefix
    );
    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}: {e}", config.bind_addr);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
