use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub user_id: Uuid,
    pub content: String,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NewNote {
    pub user_id: Uuid,
    pub content: String,
}

// ===

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token pair handed out by the identity provider, plus the user it belongs to.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    pub fn owner_id(&self) -> Uuid {
        self.user.id
    }

    pub fn email(&self) -> &str {
        self.user.email.as_deref().unwrap_or_default()
    }

    /// Fills `expires_at` from `expires_in` when the provider only sent the latter.
    pub fn with_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some(now.timestamp() + self.expires_in);
        }
        self
    }

    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at - margin.num_seconds() <= now.timestamp(),
            None => false
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OtpRequest {
    pub email: String,
    pub create_user: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct VerifyRequest {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_hash: Option<String>,
}

impl VerifyRequest {
    pub fn code(email: &str, token: &str) -> Self {
        Self {
            type_: "email".to_string(),
            email: Some(email.to_string()),
            token: Some(token.to_string()),
            ..VerifyRequest::default()
        }
    }
    pub fn link(token_hash: &str) -> Self {
        Self {
            type_: "magiclink".to_string(),
            token_hash: Some(token_hash.to_string()),
            ..VerifyRequest::default()
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Error body returned by the auth and rest endpoints. The two services
/// disagree on field names, so every field is optional.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ServiceErrorBody {
    pub fn text(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .filter(|text| !text.is_empty())
    }
}

// === realtime

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub join_ref: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ChangesFilter {
    pub event: String,
    pub schema: String,
    pub table: String,
    pub filter: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChangesPayload {
    #[serde(default)]
    pub data: ChangesData,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChangesData {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub table: String,
}

/// Status the service reports on the channel topic once it has tried to set
/// up the change subscription.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SystemPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extension: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReplyPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub response: Value,
}
