use crate::config::settings::Config;
use crate::modules::auth::controller::AuthContext;
use crate::modules::auth::model::AuthSession;
use crate::modules::session::controller::ChatController;
use crate::services::api::{ApiError, ChatApi};
use crate::services::credentials::CredentialStore;

pub mod backend;
pub mod config;
pub mod modules;
pub mod services;

/// Everything a front end needs: configuration, the HTTP client and the auth context.
pub struct AppState<S> {
    pub config: Config,
    pub api: ChatApi,
    pub auth: AuthContext<S>,
}

impl<S: CredentialStore> AppState<S> {
    /// Builds the client and restores any stored login.
    pub fn new(config: Config, store: S) -> Result<Self, ApiError> {
        let api = ChatApi::new(&config)?;
        let mut auth = AuthContext::new(api.clone(), store);
        auth.init();
        Ok(Self { config, api, auth })
    }

    pub fn chat_controller(&self, session: &AuthSession) -> ChatController {
        ChatController::new(self.api.clone(), session, self.config.sessions_per_page)
    }
}
