use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::modules::auth::{
    model::{AuthSession, AuthState, Gate, User},
    schema::CredentialsRequest,
};
use crate::services::api::{ApiError, ChatApi};
use crate::services::credentials::{
    CredentialStore, StoreError, AUTH_TOKEN_KEY, CREDENTIAL_KEYS, SESSION_ID_KEY, USER_KEY,
};

pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const SIGNUP_FAILED: &str = "Signup failed. Please try again.";
pub const NETWORK_ERROR: &str = "Network error. Please check your connection and try again.";

/// Display strings are the text shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{}", NETWORK_ERROR)]
    Network,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Login,
    Signup,
}

impl Mode {
    fn failure(self) -> &'static str {
        match self {
            Mode::Login => LOGIN_FAILED,
            Mode::Signup => SIGNUP_FAILED,
        }
    }
}

/// Owns the login lifecycle: restore from the store, login/signup, logout.
///
/// Passed explicitly to whatever needs the identity; there is no global.
pub struct AuthContext<S> {
    api: ChatApi,
    store: S,
    state: AuthState,
    error: Option<String>,
}

impl<S: CredentialStore> AuthContext<S> {
    pub fn new(api: ChatApi, store: S) -> Self {
        Self {
            api,
            store,
            state: AuthState::Loading,
            error: None,
        }
    }

    /// Reads the stored credential. Unreadable data is cleared and treated as logged out.
    pub fn init(&mut self) -> &AuthState {
        self.state = match self.restore() {
            Ok(Some(session)) => {
                info!(email = %session.user_email(), "restored stored credentials");
                AuthState::Authenticated(session)
            }
            Ok(None) => AuthState::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored credentials");
                self.clear_store();
                AuthState::Unauthenticated
            }
        };
        &self.state
    }

    fn restore(&self) -> Result<Option<AuthSession>, StoreError> {
        let read = |key: &str| -> Result<Option<String>, StoreError> {
            Ok(self.store.get(key)?.filter(|v| !v.is_empty()))
        };

        let (Some(user), Some(session_id), Some(token)) =
            (read(USER_KEY)?, read(SESSION_ID_KEY)?, read(AUTH_TOKEN_KEY)?)
        else {
            return Ok(None);
        };

        let user: User = serde_json::from_str(&user)?;
        Ok(Some(AuthSession {
            user,
            session_id,
            token,
        }))
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        self.authenticate(Mode::Login, email, password).await
    }

    /// Successful signup logs the new user in.
    pub async fn signup(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        self.authenticate(Mode::Signup, email, password).await
    }

    async fn authenticate(&mut self, mode: Mode, email: &str, password: &str) -> Result<(), AuthError> {
        self.error = None;

        let request = CredentialsRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        if let Err(e) = request.validate() {
            return Err(AuthError::Validation(e.to_string()));
        }

        let result = match mode {
            Mode::Login => self.api.login(&request).await,
            Mode::Signup => self.api.signup(&request).await,
        };

        match result {
            Ok(data) => {
                let session = AuthSession::new(data.user, data.session_id);
                info!(email = %session.user_email(), ?mode, "authenticated");
                self.persist(&session);
                self.state = AuthState::Authenticated(session);
                Ok(())
            }
            Err(e) => {
                let err = match e {
                    ApiError::Status { message, .. } => {
                        AuthError::Rejected(message.unwrap_or_else(|| mode.failure().to_string()))
                    }
                    other => {
                        warn!(error = %other, ?mode, "authentication request failed");
                        AuthError::Network
                    }
                };
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session() {
            info!(email = %session.user_email(), "logging out");
        }
        self.state = AuthState::Unauthenticated;
        self.clear_store();
        self.error = None;
    }

    fn persist(&mut self, session: &AuthSession) {
        let user = match serde_json::to_string(&session.user) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "could not serialize user");
                return;
            }
        };

        let entries = [
            (USER_KEY, user.as_str()),
            (SESSION_ID_KEY, session.session_id.as_str()),
            (AUTH_TOKEN_KEY, session.token.as_str()),
        ];
        for (key, value) in entries {
            if let Err(e) = self.store.set(key, value) {
                warn!(key, error = %e, "could not persist credential");
            }
        }
    }

    fn clear_store(&mut self) {
        for key in CREDENTIAL_KEYS {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "could not remove credential");
            }
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Loading)
    }

    pub fn gate(&self) -> Gate<'_> {
        match &self.state {
            AuthState::Loading => Gate::Loading,
            AuthState::Unauthenticated => Gate::LoginRequired,
            AuthState::Authenticated(session) => Gate::Granted(session),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn api(&self) -> &ChatApi {
        &self.api
    }
}
