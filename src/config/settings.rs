use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_AUTH_URL: &str = "https://cigpt.ca/api";
pub const DEFAULT_CHAT_URL: &str = "http://44.212.129.15:8000";
pub const DEFAULT_SESSIONS_PER_PAGE: usize = 7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_url: String,
    pub chat_url: String,
    pub sessions_per_page: usize,
    pub credentials_path: PathBuf,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth_url = var("CIGPT_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        let chat_url = var("CIGPT_CHAT_URL").unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());

        let sessions_per_page = match var("CIGPT_SESSIONS_PER_PAGE").map(|v| v.parse::<usize>()) {
            Some(Ok(n)) if n > 0 => n,
            Some(_) => {
                warn!("CIGPT_SESSIONS_PER_PAGE must be a positive integer, using {}", DEFAULT_SESSIONS_PER_PAGE);
                DEFAULT_SESSIONS_PER_PAGE
            }
            None => DEFAULT_SESSIONS_PER_PAGE,
        };

        let timeout_secs = var("CIGPT_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let credentials_path = var("CIGPT_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_default()
                    .join(".cigpt")
                    .join("credentials.json")
            });

        Self {
            auth_url,
            chat_url,
            sessions_per_page,
            credentials_path,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
