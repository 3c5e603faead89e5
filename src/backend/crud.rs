use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::modules::auth::model::User;

/// Endpoints whose failure can be forced from tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Signup,
    Sessions,
    Messages,
    NewChat,
    Delete,
    Chat,
    Testimonials,
}

/// Body layout used by `POST /new_chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewChatShape {
    #[default]
    NestedSession,
    NestedId,
    RootSession,
    RootId,
    Missing,
}

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub role: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredSession {
    pub session_id: String,
    pub username: String,
    pub title: String,
    pub messages: Vec<StoredMessage>,
}

impl StoredSession {
    pub fn summary(&self) -> Value {
        json!({
            "session_id": self.session_id,
            "title": self.title,
            "first_message": self.messages.first().map(|m| m.message.as_str()).unwrap_or("No messages yet"),
        })
    }
}

#[derive(Debug)]
struct Account {
    password: String,
    user: User,
}

#[derive(Debug)]
struct Store {
    accounts: HashMap<String, Account>,
    sessions: Vec<StoredSession>,
    failures: HashSet<Endpoint>,
    new_chat_shape: NewChatShape,
    testimonials: Value,
    next_user_id: i64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            sessions: Vec::new(),
            failures: HashSet::new(),
            new_chat_shape: NewChatShape::default(),
            testimonials: json!({
                "success": true,
                "data": { "testimonials": [
                    {
                        "user_name": "Amara",
                        "message": "CI GPT walked me through my study permit checklist.",
                        "country": "Nigeria",
                        "program": "Study Permit",
                        "rating": 5
                    },
                    {
                        "name": "Luis",
                        "text": "Clear answers about Express Entry points.",
                        "location": "Vancouver",
                        "rating": 4
                    }
                ]}
            }),
            next_user_id: 1,
        }
    }
}

/// In-memory state behind the mock chat backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    store: Arc<RwLock<Store>>,
    chat_requests: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failing(&self, endpoint: Endpoint, failing: bool) {
        let mut store = self.store.write().await;
        if failing {
            store.failures.insert(endpoint);
        } else {
            store.failures.remove(&endpoint);
        }
    }

    pub async fn is_failing(&self, endpoint: Endpoint) -> bool {
        self.store.read().await.failures.contains(&endpoint)
    }

    pub async fn set_new_chat_shape(&self, shape: NewChatShape) {
        self.store.write().await.new_chat_shape = shape;
    }

    pub async fn new_chat_shape(&self) -> NewChatShape {
        self.store.read().await.new_chat_shape
    }

    pub async fn set_testimonials(&self, body: Value) {
        self.store.write().await.testimonials = body;
    }

    pub async fn testimonials(&self) -> Value {
        self.store.read().await.testimonials.clone()
    }

    /// Registers an account; `None` if the email is taken.
    pub async fn add_user(&self, email: &str, password: &str) -> Option<User> {
        let mut store = self.store.write().await;
        if store.accounts.contains_key(email) {
            return None;
        }

        let now = Utc::now().to_rfc3339();
        let user = User {
            id: store.next_user_id,
            email: email.to_string(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            total_sessions: 0,
        };
        store.next_user_id += 1;
        store.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        Some(user)
    }

    pub async fn verify_user(&self, email: &str, password: &str) -> Option<User> {
        let store = self.store.read().await;
        store
            .accounts
            .get(email)
            .filter(|a| a.password == password)
            .map(|a| {
                let mut user = a.user.clone();
                user.total_sessions = store.sessions.iter().filter(|s| s.username == email).count() as u32;
                user
            })
    }

    pub async fn create_session(&self, username: &str, title: Option<&str>) -> StoredSession {
        let session = StoredSession {
            session_id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            title: title.unwrap_or("New Chat").to_string(),
            messages: Vec::new(),
        };
        self.store.write().await.sessions.push(session.clone());
        session
    }

    /// Creates `count` titled sessions for a user, in order.
    pub async fn seed_sessions(&self, username: &str, count: usize) -> Vec<StoredSession> {
        let mut created = Vec::with_capacity(count);
        for i in 1..=count {
            created.push(self.create_session(username, Some(&format!("Chat {}", i))).await);
        }
        created
    }

    pub async fn sessions_for(&self, username: &str) -> Vec<StoredSession> {
        self.store
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.username == username)
            .cloned()
            .collect()
    }

    pub async fn find_session(&self, session_id: &str) -> Option<StoredSession> {
        self.store
            .read()
            .await
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned()
    }

    pub async fn delete_session(&self, session_id: &str) -> bool {
        let mut store = self.store.write().await;
        let before = store.sessions.len();
        store.sessions.retain(|s| s.session_id != session_id);
        store.sessions.len() != before
    }

    pub async fn add_message(&self, session_id: &str, role: &str, message: &str) -> bool {
        let mut store = self.store.write().await;
        let Some(session) = store.sessions.iter_mut().find(|s| s.session_id == session_id) else {
            return false;
        };
        session.messages.push(StoredMessage {
            id: Uuid::new_v4().to_string(),
            role: role.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        });
        true
    }

    pub fn record_chat_request(&self) {
        self.chat_requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn chat_requests(&self) -> usize {
        self.chat_requests.load(Ordering::SeqCst)
    }
}
