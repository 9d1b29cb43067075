pub mod error;
pub mod handlers;
pub mod relay;

use std::net::{IpAddr, SocketAddr};

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

pub use error::ApiError;
pub use handlers::ApiState;
pub use relay::{RelayClient, RelayError};

/// Uploads through /api/shared_files may be large.
const UPLOAD_BODY_LIMIT: usize = 2 * 1024 * 1024 * 1024;

/// The full HTTP surface: peer protocol under /p2p, local API under /api.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let p2p_routes = Router::new()
        .route("/hello", get(handlers::handle_hello))
        .route("/list_files", get(handlers::handle_list_files))
        .route("/download_file/{id}", post(handlers::handle_download_file));

    let api_routes = Router::new()
        .route(
            "/identity",
            get(handlers::handle_get_identity).post(handlers::handle_set_identity),
        )
        .route("/peers", get(handlers::handle_peers))
        .route(
            "/shared_files",
            get(handlers::handle_list_shared).post(handlers::handle_share_upload),
        )
        .route("/shared_files/{id}", delete(handlers::handle_unshare))
        .route(
            "/peers/{address}/{port}/files",
            get(handlers::handle_relay_list_files),
        )
        .route(
            "/peers/{address}/{port}/download/{id}",
            post(handlers::handle_relay_download),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    Router::new()
        .nest("/p2p", p2p_routes)
        .nest("/api", api_routes)
        .with_state(state)
        .layer(cors)
}

/// Bind the first free port in `start..start + range`.
pub async fn bind_first_free(ip: IpAddr, start: u16, range: u16) -> anyhow::Result<TcpListener> {
    let end = start.saturating_add(range.max(1));
    for port in start..end {
        match TcpListener::bind(SocketAddr::new(ip, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "port in use, trying next");
            }
            Err(e) => return Err(e.into()),
        }
    }
    anyhow::bail!("no free port in {start}..{end}")
}

/// Serve until a shutdown signal arrives.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}
