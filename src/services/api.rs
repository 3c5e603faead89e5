use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::settings::Config;
use crate::modules::auth::schema::{AuthData, AuthResponse, CredentialsRequest};
use crate::modules::session::{
    model::{Message, Session},
    schema::{normalize_new_session, ChatReply, ChatRequest, MessagesResponse, SessionListResponse},
};
use crate::modules::testimonial::{model::Testimonial, schema::extract_testimonials};

const SKIP_BROWSER_WARNING: &str = "ngrok-skip-browser-warning";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the auth service and the chat backend.
#[derive(Clone)]
pub struct ChatApi {
    client: Client,
    auth_url: String,
    chat_url: String,
}

impl ChatApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            auth_url: config.auth_url.clone(),
            chat_url: config.chat_url.clone(),
        })
    }

    pub fn with_urls(auth_url: impl Into<String>, chat_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth_url: auth_url.into(),
            chat_url: chat_url.into(),
        }
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(base).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn chat_endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        Self::endpoint(&self.chat_url, segments)
    }

    fn with_headers(request: RequestBuilder) -> RequestBuilder {
        request.header(SKIP_BROWSER_WARNING, "true")
    }

    async fn status_error(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty());
        ApiError::Status { status, message }
    }

    pub async fn login(&self, request: &CredentialsRequest) -> Result<AuthData, ApiError> {
        self.authenticate("login", request).await
    }

    pub async fn signup(&self, request: &CredentialsRequest) -> Result<AuthData, ApiError> {
        self.authenticate("signup", request).await
    }

    async fn authenticate(&self, path: &str, request: &CredentialsRequest) -> Result<AuthData, ApiError> {
        let url = Self::endpoint(&self.auth_url, &[path])?;
        debug!(%url, email = %request.email, "authenticating");

        let response = Self::with_headers(self.client.post(url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body: AuthResponse = response.json().await?;

        match (status.is_success(), body.success, body.data) {
            (true, true, Some(data)) => Ok(data),
            _ => Err(ApiError::Status {
                status: status.as_u16(),
                message: body.message.filter(|m| !m.is_empty()),
            }),
        }
    }

    pub async fn list_sessions(&self, username: &str) -> Result<Vec<Session>, ApiError> {
        let url = self.chat_endpoint(&["sessions"])?;

        let response = Self::with_headers(self.client.get(url))
            .query(&[("username", username)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: SessionListResponse = response.json().await?;
        Ok(body.data.into_sessions())
    }

    pub async fn session_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.chat_endpoint(&["sessions", session_id, "messages"])?;

        let response = Self::with_headers(self.client.get(url)).send().await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: MessagesResponse = response.json().await?;
        Ok(body
            .data
            .map(|d| d.messages.into_iter().map(|m| m.into_message()).collect())
            .unwrap_or_default())
    }

    pub async fn new_chat(&self, username: &str) -> Result<Session, ApiError> {
        let url = self.chat_endpoint(&["new_chat"])?;

        let response = Self::with_headers(self.client.post(url))
            .query(&[("username", username)])
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: Value = response.json().await?;
        debug!(%body, "new chat response");
        normalize_new_session(&body)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let url = self.chat_endpoint(&["sessions", session_id])?;

        let response = Self::with_headers(self.client.delete(url))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        Ok(())
    }

    /// The body is parsed before the status is checked, so a non-JSON error
    /// page counts as a connectivity failure rather than a server message.
    pub async fn chat(&self, session_id: &str, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let url = self.chat_endpoint(&["chat", session_id])?;
        debug!(%url, "sending chat message");

        let response = Self::with_headers(self.client.post(url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|_| ApiError::InvalidResponse(format!("invalid JSON response: {}", text)))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    pub async fn testimonials(&self) -> Result<Vec<Testimonial>, ApiError> {
        let url = self.chat_endpoint(&["api", "testimonials"])?;

        let response = Self::with_headers(self.client.get(url)).send().await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: Value = response.json().await?;
        Ok(extract_testimonials(body)
            .iter()
            .map(Testimonial::from_value)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_segments() {
        let url = ChatApi::endpoint("https://cigpt.ca/api", &["login"]).unwrap();
        assert_eq!(url.as_str(), "https://cigpt.ca/api/login");

        let url = ChatApi::endpoint("http://localhost:8000/", &["chat", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/chat/a%20b%2Fc");
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        assert!(matches!(
            ChatApi::endpoint("not a url", &["sessions"]),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
