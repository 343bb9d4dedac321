//! Authentication endpoints.

use crate::client::{ApiClient, RequestOptions};
use crate::error::{ClientError, ClientResult};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

/// Token grant returned by `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Current user returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl ApiClient {
    /// Log in and store the returned token.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let body = json!({ "username": username, "password": password });
        let grant: LoginResponse = self
            .post("/auth/login", &body, RequestOptions::new().without_auth())
            .await?;

        self.tokens()
            .set_token(&grant.access_token)
            .map_err(|e| ClientError::unknown(format!("Failed to store token: {e}")))?;
        info!(username, "Logged in");
        Ok(grant)
    }

    /// Log out. The local token is cleared even when the server call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let result: ClientResult<IgnoredAny> = self
            .post("/auth/logout", &json!({}), RequestOptions::new())
            .await;

        if let Err(e) = self.tokens().clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        result.map(|_| ())
    }

    pub async fn current_user(&self) -> ClientResult<UserProfile> {
        self.get("/auth/me", RequestOptions::new()).await
    }
}
