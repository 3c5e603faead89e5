//! In-memory stand-in for the remote chat backend, for local runs and tests.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::error;

pub mod controller;
pub mod crud;
pub mod routes;

pub use crud::{Endpoint, MockBackend, NewChatShape};

/// Serves the mock on an ephemeral local port and returns its base URL.
pub async fn spawn(state: MockBackend) -> std::io::Result<String> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, routes::app(state)).await {
            error!(error = %e, "mock backend stopped");
        }
    });

    Ok(format!("http://{}", addr))
}
