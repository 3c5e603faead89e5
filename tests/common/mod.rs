#![allow(dead_code)]

use axum::Router;
use cigpt::backend::{self, MockBackend};
use cigpt::modules::auth::model::{AuthSession, User};
use cigpt::services::api::ChatApi;
use tokio::net::TcpListener;

pub async fn start_backend() -> (MockBackend, ChatApi) {
    let backend = MockBackend::new();
    let url = backend::spawn(backend.clone()).await.unwrap();
    let api = ChatApi::with_urls(url.clone(), url);
    (backend, api)
}

/// Serves a hand-written router, for responses the mock backend never produces.
pub async fn serve(app: Router) -> ChatApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    ChatApi::with_urls(url.clone(), url)
}

pub fn auth_session(email: &str, session_id: &str) -> AuthSession {
    AuthSession::new(
        User {
            id: 1,
            email: email.to_string(),
            created_at: None,
            updated_at: None,
            total_sessions: 0,
        },
        session_id,
    )
}

/// A local address with nothing listening on it.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
