use serde::{Deserialize, Serialize};

pub const LOGIN_REQUIRED_TITLE: &str = "PLEASE LOGIN TO USE GPT";
pub const LOGIN_REQUIRED_DETAIL: &str =
    "You need to be logged in to access CI GPT's immigration assistance features.";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub total_sessions: u32,
}

/// The logged-in identity. The login session id doubles as the auth token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: User,
    pub session_id: String,
    pub token: String,
}

impl AuthSession {
    pub fn new(user: User, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            user,
            token: session_id.clone(),
            session_id,
        }
    }

    pub fn user_email(&self) -> &str {
        &self.user.email
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Stored credentials have not been read yet.
    Loading,
    Unauthenticated,
    Authenticated(AuthSession),
}

/// What a protected view should render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate<'a> {
    Loading,
    LoginRequired,
    Granted(&'a AuthSession),
}
