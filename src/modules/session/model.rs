use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "New Chat";
pub const DEFAULT_PREVIEW: &str = "No messages yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Anything the backend does not call `user` is rendered as the assistant.
    pub fn from_wire(role: &str) -> Self {
        if role == "user" {
            Role::User
        } else {
            Role::Bot
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(prefix: &str, role: Role, content: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            id: local_id(prefix, timestamp),
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", Role::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new("bot", Role::Bot, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new("error", Role::Bot, content)
    }

    pub fn welcome(content: impl Into<String>) -> Self {
        Self::new("welcome", Role::Bot, content)
    }
}

// `<prefix>_<millis>_<token>`: the token keeps ids unique within one millisecond.
fn local_id(prefix: &str, at: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, at.timestamp_millis(), &token[..8])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub title: String,
    pub first_message_preview: String,
}

impl Session {
    pub fn new(session_id: impl Into<String>, title: Option<String>, preview: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            first_message_preview: preview
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PREVIEW.to_string()),
        }
    }
}

/// Client-side pagination over a session list fetched once per user.
///
/// `displayed` is always a prefix of `all`: inserts happen at the head of
/// both lists and removals apply to both, so the next page starts at
/// `displayed.len()`.
#[derive(Debug, Clone)]
pub struct SessionList {
    all: Vec<Session>,
    displayed: Vec<Session>,
    page_size: usize,
}

impl SessionList {
    pub fn new(page_size: usize) -> Self {
        Self {
            all: Vec::new(),
            displayed: Vec::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn replace(&mut self, sessions: Vec<Session>) {
        self.displayed = sessions.iter().take(self.page_size).cloned().collect();
        self.all = sessions;
    }

    pub fn clear(&mut self) {
        self.all.clear();
        self.displayed.clear();
    }

    /// Reveals the next page. Returns how many sessions were added.
    pub fn load_more(&mut self) -> usize {
        let start = self.displayed.len();
        let end = (start + self.page_size).min(self.all.len());
        if start >= end {
            return 0;
        }
        self.displayed.extend_from_slice(&self.all[start..end]);
        end - start
    }

    pub fn has_more(&self) -> bool {
        self.displayed.len() < self.all.len()
    }

    pub fn prepend(&mut self, session: Session) {
        self.all.insert(0, session.clone());
        self.displayed.insert(0, session);
    }

    pub fn remove(&mut self, session_id: &str) -> bool {
        let before = self.all.len();
        self.all.retain(|s| s.session_id != session_id);
        self.displayed.retain(|s| s.session_id != session_id);
        self.all.len() != before
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.all.iter().any(|s| s.session_id == session_id)
    }

    pub fn all(&self) -> &[Session] {
        &self.all
    }

    pub fn displayed(&self) -> &[Session] {
        &self.displayed
    }
}
