use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;

use shared::constants::{API_LOGOUT, API_OTP, API_TOKEN, API_VERIFY, ROOT_AUTH};
use shared::types::{OtpRequest, RefreshRequest, Session, VerifyRequest};

use crate::connect_http::{send_empty, send_json, SupabaseHttp};
use crate::error::RemoteError;
use crate::gateway::AuthGateway;

pub struct SupabaseAuth {
    http: SupabaseHttp,
}

impl SupabaseAuth {
    pub fn new(http: SupabaseHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthGateway for SupabaseAuth {
    async fn send_magic_link(&self, email: &str) -> Result<(), RemoteError> {
        let body = OtpRequest { email: email.to_string(), create_user: true };
        let request = self.http
            .request(Method::POST, &format!("{ROOT_AUTH}/{API_OTP}"), None)
            .json(&body);
        send_empty(request).await
    }

    async fn verify(&self, body: &VerifyRequest) -> Result<Session, RemoteError> {
        let request = self.http
            .request(Method::POST, &format!("{ROOT_AUTH}/{API_VERIFY}"), None)
            .json(body);
        let session: Session = send_json(request).await?;
        Ok(session.with_expiry(Utc::now()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, RemoteError> {
        let body = RefreshRequest { refresh_token: refresh_token.to_string() };
        let request = self.http
            .request(Method::POST, &format!("{ROOT_AUTH}/{API_TOKEN}"), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&body);
        let session: Session = send_json(request).await?;
        Ok(session.with_expiry(Utc::now()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError> {
        let request = self.http
            .request(Method::POST, &format!("{ROOT_AUTH}/{API_LOGOUT}"), Some(access_token));
        send_empty(request).await
    }
}
