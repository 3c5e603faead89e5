//! Run with: cargo run --bin mock_backend
//!
//! Then point the client at it:
//! CIGPT_AUTH_URL=http://127.0.0.1:8000 CIGPT_CHAT_URL=http://127.0.0.1:8000 cargo run -- login -e demo@cigpt.ca -p demo

use std::env;
use std::net::SocketAddr;

use cigpt::backend::{routes, MockBackend};
use cigpt::config::logging;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let port = env::var("MOCK_BACKEND_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let backend = MockBackend::new();
    backend.add_user("demo@cigpt.ca", "demo").await;
    backend.seed_sessions("demo@cigpt.ca", 9).await;

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    println!("Mock backend listening on http://{}", addr);
    println!("Demo account: demo@cigpt.ca / demo");

    axum::serve(listener, routes::app(backend)).await?;
    Ok(())
}
