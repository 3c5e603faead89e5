mod common;

use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use cigpt::backend::Endpoint;
use cigpt::modules::session::controller::{ChatController, ChatError, CONNECTIVITY_ERROR, SESSION_EXPIRED};
use cigpt::modules::session::model::Role;
use cigpt::services::api::ChatApi;
use serde_json::json;

const EMAIL: &str = "li@example.com";

#[tokio::test]
async fn test_user_message_appended_before_network() {
    let (backend, api) = common::start_backend().await;
    let stored = backend.create_session(EMAIL, None).await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, &stored.session_id), 7);

    let pending = chat.begin_send("  What is Express Entry?  ").unwrap().unwrap();

    let last = chat.transcript().last().unwrap();
    assert_eq!(last.role, Role::User);
    assert_eq!(last.content, "What is Express Entry?");
    assert_eq!(chat.transcript().len(), 2);
    assert!(chat.is_sending());
    assert_eq!(backend.chat_requests(), 0);

    let api = chat.api().clone();
    let result = api.chat(&pending.session_id, &pending.request).await;
    chat.finish_send(pending, result);

    let last = chat.transcript().last().unwrap();
    assert_eq!(last.role, Role::Bot);
    assert_eq!(last.content, "You asked: What is Express Entry?");
    assert!(!chat.is_sending());
    assert_eq!(backend.chat_requests(), 1);
}

#[tokio::test]
async fn test_send_without_session_reports_expiry() {
    let (backend, api) = common::start_backend().await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, ""), 7);

    chat.send_message("hello").await.unwrap();

    let expired: Vec<_> = chat
        .transcript()
        .iter()
        .filter(|m| m.content == SESSION_EXPIRED)
        .collect();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].role, Role::Bot);
    assert_eq!(chat.transcript().last().unwrap().content, SESSION_EXPIRED);
    assert_eq!(backend.chat_requests(), 0);
    assert!(!chat.is_sending());
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let (backend, api) = common::start_backend().await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, "s1"), 7);

    let result = chat.send_message("   \n ").await;

    assert!(matches!(result, Err(ChatError::EmptyMessage)));
    assert_eq!(chat.transcript().len(), 1);
    assert_eq!(backend.chat_requests(), 0);
}

#[tokio::test]
async fn test_second_send_rejected_while_in_flight() {
    let (_backend, api) = common::start_backend().await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, "s1"), 7);

    let pending = chat.begin_send("first").unwrap();

    assert!(matches!(chat.begin_send("second"), Err(ChatError::Busy)));
    assert_eq!(chat.transcript().len(), 2);

    drop(pending);
    assert!(!chat.is_sending());
    assert!(chat.begin_send("third").unwrap().is_some());
}

#[tokio::test]
async fn test_cancelled_send_releases_controller() {
    let app = Router::new().route(
        "/chat/{id}",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "response": "too late" }))
        }),
    );
    let api = common::serve(app).await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, "s1"), 7);

    let outcome = tokio::time::timeout(Duration::from_millis(200), chat.send_message("hello")).await;

    assert!(outcome.is_err());
    assert!(!chat.is_sending());
    assert_eq!(chat.transcript().len(), 2);
    assert_eq!(chat.transcript()[1].content, "hello");
    assert!(chat.begin_send("hello again").unwrap().is_some());
}

#[tokio::test]
async fn test_reply_is_appended() {
    let (backend, api) = common::start_backend().await;
    let stored = backend.create_session(EMAIL, None).await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, &stored.session_id), 7);

    chat.send_message("Do I need a visa?").await.unwrap();

    let transcript = chat.transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].role, Role::User);
    assert_eq!(transcript[2].content, "You asked: Do I need a visa?");
    assert_eq!(backend.find_session(&stored.session_id).await.unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_server_error_becomes_bot_message() {
    let (backend, api) = common::start_backend().await;
    let stored = backend.create_session(EMAIL, None).await;
    backend.set_failing(Endpoint::Chat, true).await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, &stored.session_id), 7);

    chat.send_message("hello").await.unwrap();

    let last = chat.transcript().last().unwrap();
    assert_eq!(last.role, Role::Bot);
    assert_eq!(last.content, "Sorry, I encountered an error: Injected failure");
    assert!(!chat.is_sending());
}

#[tokio::test]
async fn test_unknown_session_error_message() {
    let (_backend, api) = common::start_backend().await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, "gone"), 7);

    chat.send_message("hello").await.unwrap();

    assert_eq!(
        chat.transcript().last().unwrap().content,
        "Sorry, I encountered an error: Session not found"
    );
}

#[tokio::test]
async fn test_network_failure_becomes_connectivity_message() {
    let url = common::unreachable_url().await;
    let api = ChatApi::with_urls(url.clone(), url);
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, "s1"), 7);

    chat.send_message("hello").await.unwrap();

    let transcript = chat.transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].content, "hello");
    assert_eq!(transcript[2].content, CONNECTIVITY_ERROR);
    assert_eq!(transcript[2].role, Role::Bot);
}

#[tokio::test]
async fn test_selected_session_wins_over_login_session() {
    let (backend, api) = common::start_backend().await;
    let login = backend.create_session(EMAIL, None).await;
    let other = backend.create_session(EMAIL, None).await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, &login.session_id), 7);

    assert_eq!(chat.active_session_id(), Some(login.session_id.as_str()));
    chat.select_session(&other.session_id).await;
    assert_eq!(chat.active_session_id(), Some(other.session_id.as_str()));

    chat.send_message("hi").await.unwrap();

    assert!(backend.find_session(&login.session_id).await.unwrap().messages.is_empty());
    assert_eq!(backend.find_session(&other.session_id).await.unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_late_reply_lands_in_current_transcript() {
    let (backend, api) = common::start_backend().await;
    let first = backend.create_session(EMAIL, None).await;
    let second = backend.create_session(EMAIL, None).await;
    backend.add_message(&second.session_id, "user", "earlier question").await;
    let mut chat = ChatController::new(api, &common::auth_session(EMAIL, &first.session_id), 7);

    let pending = chat.begin_send("question for first").unwrap().unwrap();
    let api = chat.api().clone();
    let reply = api.chat(&pending.session_id, &pending.request).await;

    chat.select_session(&second.session_id).await;
    chat.finish_send(pending, reply);

    let transcript = chat.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].content, "earlier question");
    assert_eq!(transcript[1].content, "You asked: question for first");
}
