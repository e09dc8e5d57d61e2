//! Supabase auth session handling for the CLI.
//!
//! Sessions live in a JSON file under the user's config directory so a login
//! survives across invocations.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CliError;

const EXPIRY_SKEW_SECONDS: i64 = 30;

#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user_id: String,
    pub email: Option<String>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= chrono::Utc::now().timestamp() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}

pub fn session_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptduel")
        .join("session.json")
}

pub fn load_session() -> Result<Option<Session>, CliError> {
    let path = session_path();
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

pub fn save_session(session: &Session) -> Result<(), CliError> {
    let path = session_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(session)?)?;
    Ok(())
}

pub fn clear_session() -> Result<(), CliError> {
    let path = session_path();
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

pub struct SupabaseAuth {
    auth_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl SupabaseAuth {
    pub fn from_env() -> Result<Self, CliError> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| CliError::Auth("SUPABASE_URL is not set".to_string()))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| CliError::Auth("SUPABASE_ANON_KEY is not set".to_string()))?;
        Ok(Self {
            auth_url: normalize_auth_url(&url)?,
            anon_key,
            client: reqwest::Client::new(),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, CliError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(CliError::Auth(
                "Email and password are required".to_string(),
            ));
        }

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let response = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::Auth(format!(
                "Sign-in failed (HTTP {status}): {}",
                extract_error_message(&body)
            )));
        }

        let auth: AuthResponse = response.json().await?;
        auth.into_session()
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

impl AuthResponse {
    fn into_session(self) -> Result<Session, CliError> {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|expires_in| chrono::Utc::now().timestamp().saturating_add(expires_in))
        });

        match (self.access_token, self.refresh_token, expires_at, self.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Session {
                    access_token,
                    refresh_token,
                    expires_at,
                    user_id: user.id,
                    email: user.email,
                })
            }
            _ => Err(CliError::Auth(
                "Sign-in response did not include an active session".to_string(),
            )),
        }
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error_description")
                .or_else(|| value.get("msg"))
                .or_else(|| value.get("message"))
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

pub fn normalize_auth_url(url: &str) -> Result<String, CliError> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(CliError::Auth("Supabase URL must not be empty".to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(CliError::Auth(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_auth_url_appends_auth_suffix() {
        let normalized = normalize_auth_url("https://demo.supabase.co").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_keeps_auth_suffix() {
        let normalized = normalize_auth_url("https://demo.supabase.co/auth/v1/").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_rejects_plain_host() {
        assert!(normalize_auth_url("demo.supabase.co").is_err());
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = Session {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user_id: "user".to_string(),
            email: None,
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn auth_response_derives_expiry_from_expires_in() {
        let response = AuthResponse {
            access_token: Some("a".to_string()),
            refresh_token: Some("r".to_string()),
            expires_at: None,
            expires_in: Some(3600),
            user: Some(AuthUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
            }),
        };

        let session = response.into_session().unwrap();
        assert!(session.expires_at > chrono::Utc::now().timestamp());
        assert!(!session.is_expired());
    }

    #[test]
    fn auth_response_without_tokens_is_an_error() {
        let response = AuthResponse {
            access_token: None,
            refresh_token: None,
            expires_at: None,
            expires_in: None,
            user: None,
        };
        assert!(response.into_session().is_err());
    }
}
