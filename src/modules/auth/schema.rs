use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::auth::model::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, message = "Email cannot be empty"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<AuthData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthData {
    pub user: User,
    pub session_id: String,
}
