use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use validator::Validate;

use crate::backend::crud::{Endpoint, MockBackend, NewChatShape};
use crate::modules::auth::{
    model::User,
    schema::{AuthData, CredentialsRequest},
};
use crate::modules::session::schema::ChatRequest;

type ApiResult = Result<(StatusCode, Json<Value>), (StatusCode, Json<ErrorBody>)>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
}

fn fail(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            success: false,
            message: message.to_string(),
        }),
    )
}

async fn check_injected(state: &MockBackend, endpoint: Endpoint) -> Result<(), (StatusCode, Json<ErrorBody>)> {
    if state.is_failing(endpoint).await {
        return Err(fail(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure"));
    }
    Ok(())
}

fn require_username(query: UsernameQuery) -> Result<String, (StatusCode, Json<ErrorBody>)> {
    query
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "username is required"))
}

async fn issue_login(state: &MockBackend, user: User) -> Value {
    let session = state.create_session(&user.email, None).await;
    let data = AuthData {
        user,
        session_id: session.session_id,
    };
    json!({ "success": true, "data": data })
}

pub async fn login(State(state): State<MockBackend>, Json(payload): Json<CredentialsRequest>) -> ApiResult {
    check_injected(&state, Endpoint::Login).await?;
    if let Err(e) = payload.validate() {
        return Err(fail(StatusCode::BAD_REQUEST, &e.to_string()));
    }

    let user = state
        .verify_user(&payload.email, &payload.password)
        .await
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    Ok((StatusCode::OK, Json(issue_login(&state, user).await)))
}

pub async fn signup(State(state): State<MockBackend>, Json(payload): Json<CredentialsRequest>) -> ApiResult {
    check_injected(&state, Endpoint::Signup).await?;
    if let Err(e) = payload.validate() {
        return Err(fail(StatusCode::BAD_REQUEST, &e.to_string()));
    }

    let user = state
        .add_user(&payload.email, &payload.password)
        .await
        .ok_or_else(|| fail(StatusCode::CONFLICT, "User already exists"))?;

    Ok((StatusCode::CREATED, Json(issue_login(&state, user).await)))
}

pub async fn list_sessions(State(state): State<MockBackend>, Query(query): Query<UsernameQuery>) -> ApiResult {
    check_injected(&state, Endpoint::Sessions).await?;
    let username = require_username(query)?;

    let sessions: Vec<Value> = state
        .sessions_for(&username)
        .await
        .iter()
        .map(|s| s.summary())
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "sessions": sessions } })),
    ))
}

pub async fn session_messages(State(state): State<MockBackend>, Path(id): Path<String>) -> ApiResult {
    check_injected(&state, Endpoint::Messages).await?;

    let session = state
        .find_session(&id)
        .await
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Session not found"))?;

    let messages: Vec<Value> = session
        .messages
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "role": m.role,
                "message": m.message,
                "created_at": m.created_at.to_rfc3339(),
            })
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "messages": messages } })),
    ))
}

pub async fn new_chat(State(state): State<MockBackend>, Query(query): Query<UsernameQuery>) -> ApiResult {
    check_injected(&state, Endpoint::NewChat).await?;
    let username = require_username(query)?;

    let session = state.create_session(&username, None).await;
    let record = json!({
        "session_id": session.session_id,
        "title": session.title,
        "first_message": "No messages yet",
    });

    let body = match state.new_chat_shape().await {
        NewChatShape::NestedSession => json!({ "success": true, "data": { "session": record } }),
        NewChatShape::NestedId => json!({ "success": true, "data": record }),
        NewChatShape::RootSession => json!({ "success": true, "session": record }),
        NewChatShape::RootId => record,
        NewChatShape::Missing => json!({ "success": true, "data": {} }),
    };

    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn delete_session(State(state): State<MockBackend>, Path(id): Path<String>) -> ApiResult {
    check_injected(&state, Endpoint::Delete).await?;

    if !state.delete_session(&id).await {
        return Err(fail(StatusCode::NOT_FOUND, "Session not found"));
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Deleted successfully" })),
    ))
}

/// Echo bot: stores the turn and answers with the user's text quoted back.
pub async fn chat(
    State(state): State<MockBackend>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> ApiResult {
    state.record_chat_request();
    check_injected(&state, Endpoint::Chat).await?;

    if let Err(e) = payload.validate() {
        return Err(fail(StatusCode::BAD_REQUEST, &e.to_string()));
    }
    if state.find_session(&id).await.is_none() {
        return Err(fail(StatusCode::NOT_FOUND, "Session not found"));
    }

    let reply = format!("You asked: {}", payload.message);
    state.add_message(&id, "user", &payload.message).await;
    state.add_message(&id, "assistant", &reply).await;
    debug!(session_id = %id, "mock chat turn stored");

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "response": reply, "data": { "reply": reply } })),
    ))
}

pub async fn testimonials(State(state): State<MockBackend>) -> ApiResult {
    check_injected(&state, Endpoint::Testimonials).await?;
    Ok((StatusCode::OK, Json(state.testimonials().await)))
}
