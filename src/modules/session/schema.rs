use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use validator::Validate;

use crate::modules::session::model::{Message, Role, Session};
use crate::modules::wire::{id_text, truthy};
use crate::services::api::ApiError;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub data: Option<ChatReplyData>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatReplyData {
    #[serde(default)]
    pub reply: Option<String>,
}

impl ChatReply {
    /// `response` wins over `data.reply`; empty strings count as missing.
    pub fn into_text(self) -> Option<String> {
        self.response
            .filter(|r| !r.is_empty())
            .or_else(|| self.data.and_then(|d| d.reply).filter(|r| !r.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionListResponse {
    pub data: SessionListData,
}

#[derive(Debug, Deserialize)]
pub struct SessionListData {
    #[serde(default)]
    pub sessions: Vec<Value>,
}

impl SessionListData {
    /// Records without a usable `session_id` are dropped, not fatal.
    pub fn into_sessions(self) -> Vec<Session> {
        self.sessions
            .iter()
            .filter_map(|record| {
                let session = session_from_record(record);
                if session.is_none() {
                    warn!(%record, "skipping session record without id");
                }
                session
            })
            .collect()
    }
}

/// A session record with a string or numeric `session_id`.
pub fn session_from_record(record: &Value) -> Option<Session> {
    let session_id = id_text(record.get("session_id"))?;
    let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);
    Some(Session::new(session_id, text("title"), text("first_message")))
}

#[derive(Debug, Deserialize)]
pub struct MessageDto {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl MessageDto {
    pub fn into_message(self) -> Message {
        let role = Role::from_wire(self.role.as_deref().unwrap_or_default());
        let timestamp = parse_timestamp(self.created_at.as_deref());
        let id = id_text(self.id.as_ref()).unwrap_or_else(|| {
            let prefix = self.role.as_deref().filter(|r| !r.is_empty()).unwrap_or("bot");
            format!("{}_{}", prefix, Utc::now().timestamp_millis())
        });

        Message {
            id,
            role,
            content: self.message.unwrap_or_default(),
            timestamp,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct MessagesResponse {
    #[serde(default)]
    pub data: Option<MessagesData>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MessagesData {
    #[serde(default)]
    pub messages: Vec<MessageDto>,
}

/// Accepts RFC 3339 and the naive ISO-8601 form (read as UTC); anything else is "now".
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                    .map(|naive| naive.and_utc())
            })
    })
    .unwrap_or_else(Utc::now)
}

/// Maps every tolerated `POST /new_chat` body onto one [`Session`].
///
/// Checked in order: `data.session`, `data.session_id`, root `session`,
/// root `session_id`.
pub fn normalize_new_session(body: &Value) -> Result<Session, ApiError> {
    let data = body.get("data");
    let nested_session = data.and_then(|d| d.get("session"));
    let root_session = body.get("session");

    let record = if truthy(nested_session) {
        nested_session
    } else if truthy(data.and_then(|d| d.get("session_id"))) {
        data
    } else if truthy(root_session) {
        root_session
    } else if truthy(body.get("session_id")) {
        Some(body)
    } else {
        None
    };

    let record = record.ok_or_else(|| {
        ApiError::MalformedResponse(format!("no session data found in {}", body))
    })?;

    session_from_record(record)
        .ok_or_else(|| ApiError::MalformedResponse(format!("invalid session data: {}", record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::session::model::{DEFAULT_PREVIEW, DEFAULT_TITLE};
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_normalize_nested_session() {
        let body = json!({
            "data": { "session": { "session_id": "a1", "title": "Visa", "first_message": "Hi" } }
        });

        let session = normalize_new_session(&body).unwrap();
        assert_eq!(session.session_id, "a1");
        assert_eq!(session.title, "Visa");
        assert_eq!(session.first_message_preview, "Hi");
    }

    #[test]
    fn test_normalize_nested_id_uses_defaults() {
        let body = json!({ "data": { "session_id": "b2" } });

        let session = normalize_new_session(&body).unwrap();
        assert_eq!(session.session_id, "b2");
        assert_eq!(session.title, DEFAULT_TITLE);
        assert_eq!(session.first_message_preview, DEFAULT_PREVIEW);
    }

    #[test]
    fn test_normalize_root_shapes() {
        let root_session = json!({ "session": { "session_id": "c3", "title": "Study permit" } });
        assert_eq!(normalize_new_session(&root_session).unwrap().session_id, "c3");

        let root_id = json!({ "session_id": 42, "title": "Work permit" });
        let session = normalize_new_session(&root_id).unwrap();
        assert_eq!(session.session_id, "42");
        assert_eq!(session.title, "Work permit");
    }

    #[test]
    fn test_normalize_prefers_nested_over_root() {
        let body = json!({
            "data": { "session_id": "nested" },
            "session_id": "root"
        });
        assert_eq!(normalize_new_session(&body).unwrap().session_id, "nested");
    }

    #[test]
    fn test_normalize_rejects_unknown_shape() {
        let body = json!({ "success": true, "data": {} });
        assert!(matches!(
            normalize_new_session(&body),
            Err(ApiError::MalformedResponse(_))
        ));

        let empty_id = json!({ "data": { "session": { "title": "No id" } } });
        assert!(matches!(
            normalize_new_session(&empty_id),
            Err(ApiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_message_dto_normalization() {
        let dto: MessageDto = serde_json::from_value(json!({
            "role": "assistant",
            "message": "Express Entry is a points system.",
            "created_at": "2024-03-05T10:20:30.123456"
        }))
        .unwrap();

        let message = dto.into_message();
        assert_eq!(message.role, Role::Bot);
        assert_eq!(message.content, "Express Entry is a points system.");
        assert!(message.id.starts_with("assistant_"));
        assert_eq!(message.timestamp.year(), 2024);
        assert_eq!(message.timestamp.hour(), 10);
    }

    #[test]
    fn test_message_dto_keeps_backend_id() {
        let dto: MessageDto = serde_json::from_value(json!({
            "id": 17,
            "role": "user",
            "message": "hello",
            "created_at": "2024-03-05T10:20:30Z"
        }))
        .unwrap();

        let message = dto.into_message();
        assert_eq!(message.id, "17");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.timestamp.minute(), 20);
    }

    #[test]
    fn test_message_without_role_is_bot() {
        let dto: MessageDto = serde_json::from_value(json!({
            "message": "Processing times vary by office.",
            "created_at": "2024-03-05T10:20:30Z"
        }))
        .unwrap();

        let message = dto.into_message();
        assert_eq!(message.role, Role::Bot);
        assert_eq!(message.content, "Processing times vary by office.");
        assert!(message.id.starts_with("bot_"));
    }

    #[test]
    fn test_session_list_accepts_numeric_ids_and_skips_bad_records() {
        let body: SessionListResponse = serde_json::from_value(json!({
            "data": { "sessions": [
                { "session_id": 1, "title": "Numeric" },
                { "title": "No id" },
                { "session_id": "x", "first_message": "hello" },
                "not a record"
            ] }
        }))
        .unwrap();

        let sessions = body.data.into_sessions();
        let ids: Vec<_> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, ["1", "x"]);
        assert_eq!(sessions[0].title, "Numeric");
        assert_eq!(sessions[1].first_message_preview, "hello");
    }

    #[test]
    fn test_chat_reply_fallbacks() {
        let reply: ChatReply = serde_json::from_value(json!({ "response": "", "data": { "reply": "from data" } })).unwrap();
        assert_eq!(reply.into_text().as_deref(), Some("from data"));

        let reply: ChatReply = serde_json::from_value(json!({ "success": true })).unwrap();
        assert_eq!(reply.into_text(), None);
    }
}
