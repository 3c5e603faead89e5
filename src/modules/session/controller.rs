use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::modules::auth::model::AuthSession;
use crate::modules::session::{
    model::{Message, Session, SessionList},
    schema::{ChatReply, ChatRequest},
};
use crate::services::api::{ApiError, ChatApi};

pub const SESSION_EXPIRED: &str = "Session expired. Please log in again to continue.";
pub const NO_REPLY: &str = "I received your message but couldn't generate a response.";
pub const DEFAULT_API_ERROR: &str = "Unable to process your request";
pub const CONNECTIVITY_ERROR: &str = "Sorry, I'm having trouble connecting to the server. Please check your internet connection and try again.";

pub fn welcome_text(email: &str) -> String {
    format!(
        "Hello {}! I'm CI GPT, your Canadian immigration assistant. How can I help you today?",
        email
    )
}

pub fn new_session_welcome_text(email: &str) -> String {
    format!(
        "Hello {}! I'm CI GPT, your Canadian immigration assistant. This is a new chat session. How can I help you today?",
        email
    )
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("A message is already being sent")]
    Busy,
    #[error("No user email available")]
    MissingUser,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Clears the controller's in-flight flag when the send it belongs to ends,
/// including when the send is abandoned.
#[derive(Debug)]
struct SendGuard(Arc<AtomicBool>);

impl Drop for SendGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A chat turn whose user message is already in the transcript.
///
/// The controller stays busy for as long as this value lives.
#[derive(Debug)]
pub struct PendingSend {
    pub session_id: String,
    pub request: ChatRequest,
    _guard: SendGuard,
}

/// Session list, selection and transcript for one logged-in user.
///
/// Failures never roll the transcript back; they show up as extra bot
/// messages or leave the previous state untouched.
pub struct ChatController {
    api: ChatApi,
    user_email: String,
    login_session_id: Option<String>,
    sessions: SessionList,
    selected: Option<String>,
    transcript: Vec<Message>,
    sending: Arc<AtomicBool>,
}

impl ChatController {
    pub fn new(api: ChatApi, auth: &AuthSession, sessions_per_page: usize) -> Self {
        let user_email = auth.user_email().to_string();
        let transcript = vec![Message::welcome(welcome_text(&user_email))];

        Self {
            api,
            login_session_id: Some(auth.session_id.clone()).filter(|id| !id.is_empty()),
            user_email,
            sessions: SessionList::new(sessions_per_page),
            selected: None,
            transcript,
            sending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fetches every session for the user and shows the first page.
    /// A failed fetch empties the list; it is logged, not returned.
    pub async fn load_sessions(&mut self) {
        if self.user_email.is_empty() {
            return;
        }

        match self.api.list_sessions(&self.user_email).await {
            Ok(sessions) => {
                self.sessions.replace(sessions);
                info!(
                    total = self.sessions.all().len(),
                    displayed = self.sessions.displayed().len(),
                    has_more = self.sessions.has_more(),
                    "loaded sessions"
                );
            }
            Err(e) => {
                error!(error = %e, "error fetching chat history");
                self.sessions.clear();
            }
        }
    }

    pub fn load_more(&mut self) -> usize {
        let added = self.sessions.load_more();
        debug!(
            added,
            displayed = self.sessions.displayed().len(),
            has_more = self.sessions.has_more(),
            "loaded more sessions"
        );
        added
    }

    pub async fn create_session(&mut self) -> Result<Session, ChatError> {
        if self.user_email.is_empty() {
            return Err(ChatError::MissingUser);
        }

        let session = self
            .api
            .new_chat(&self.user_email)
            .await
            .inspect_err(|e| error!(error = %e, "error creating new session"))?;

        info!(session_id = %session.session_id, "new chat session created");
        self.sessions.prepend(session.clone());
        self.selected = Some(session.session_id.clone());
        self.transcript = vec![Message::welcome(new_session_welcome_text(&self.user_email))];
        Ok(session)
    }

    pub async fn delete_session(&mut self, session_id: &str) -> Result<(), ChatError> {
        self.api
            .delete_session(session_id)
            .await
            .inspect_err(|e| error!(session_id, error = %e, "error deleting session"))?;

        self.sessions.remove(session_id);
        if self.selected.as_deref() == Some(session_id) {
            self.selected = None;
            self.transcript.clear();
        }
        info!(session_id, "session deleted");
        Ok(())
    }

    /// Selects a session and replaces the transcript with its stored history.
    pub async fn select_session(&mut self, session_id: &str) {
        self.selected = Some(session_id.to_string());

        match self.api.session_messages(session_id).await {
            Ok(messages) => {
                debug!(session_id, count = messages.len(), "loaded session messages");
                self.transcript = messages;
            }
            Err(e) => {
                error!(session_id, error = %e, "error fetching session messages");
                self.transcript.clear();
            }
        }
    }

    /// Selected session first, then the one handed out at login.
    pub fn active_session_id(&self) -> Option<&str> {
        self.selected
            .as_deref()
            .or(self.login_session_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Validates and optimistically appends the user's message.
    ///
    /// Returns `None` when there is no session to send to; the transcript then
    /// ends with the session-expired notice and nothing must be sent. A
    /// returned [`PendingSend`] is completed with [`Self::finish_send`]; dropping
    /// it instead abandons the turn without a bot message.
    pub fn begin_send(&mut self, text: &str) -> Result<Option<PendingSend>, ChatError> {
        if self.is_sending() {
            return Err(ChatError::Busy);
        }

        let request = ChatRequest {
            message: text.trim().to_string(),
        };
        if request.validate().is_err() {
            return Err(ChatError::EmptyMessage);
        }

        self.transcript.push(Message::user(request.message.as_str()));

        let Some(session_id) = self.active_session_id().map(str::to_string) else {
            warn!("no session id available for chat");
            self.transcript.push(Message::error(SESSION_EXPIRED));
            return Ok(None);
        };

        self.sending.store(true, Ordering::Release);
        Ok(Some(PendingSend {
            session_id,
            request,
            _guard: SendGuard(Arc::clone(&self.sending)),
        }))
    }

    /// Appends the outcome of a chat turn, whatever session is selected by now.
    pub fn finish_send(&mut self, pending: PendingSend, result: Result<ChatReply, ApiError>) {
        drop(pending);

        let message = match result {
            Ok(reply) => Message::bot(reply.into_text().unwrap_or_else(|| NO_REPLY.to_string())),
            Err(ApiError::Status { status, message }) => {
                warn!(status, "chat request rejected");
                Message::error(format!(
                    "Sorry, I encountered an error: {}",
                    message.as_deref().unwrap_or(DEFAULT_API_ERROR)
                ))
            }
            Err(e) => {
                error!(error = %e, "chat request failed");
                Message::error(CONNECTIVITY_ERROR)
            }
        };
        self.transcript.push(message);
    }

    pub async fn send_message(&mut self, text: &str) -> Result<(), ChatError> {
        let Some(pending) = self.begin_send(text)? else {
            return Ok(());
        };

        let result = self.api.chat(&pending.session_id, &pending.request).await;
        self.finish_send(pending, result);
        Ok(())
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn sessions(&self) -> &SessionList {
        &self.sessions
    }

    pub fn displayed_sessions(&self) -> &[Session] {
        self.sessions.displayed()
    }

    pub fn has_more_sessions(&self) -> bool {
        self.sessions.has_more()
    }

    pub fn selected_session_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn api(&self) -> &ChatApi {
        &self.api
    }
}
