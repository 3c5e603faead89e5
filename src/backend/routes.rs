use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::backend::{controller, crud::MockBackend};

pub fn routes() -> Router<MockBackend> {
    Router::new()
        .route("/login", post(controller::login))
        .route("/signup", post(controller::signup))
        .route("/sessions", get(controller::list_sessions))
        .route("/sessions/{id}", delete(controller::delete_session))
        .route("/sessions/{id}/messages", get(controller::session_messages))
        .route("/new_chat", post(controller::new_chat))
        .route("/chat/{id}", post(controller::chat))
        .route("/api/testimonials", get(controller::testimonials))
}

pub fn app(state: MockBackend) -> Router {
    routes().layer(CorsLayer::permissive()).with_state(state)
}
