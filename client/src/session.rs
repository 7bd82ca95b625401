use std::sync::Arc;

use chrono::{Duration, Utc};
use futures_signals::signal::Signal;

use shared::types::{Session, VerifyRequest};

use crate::constants::ALERT_CHECK_EMAIL;
use crate::error::{AppError, RemoteError};
use crate::gateway::AuthGateway;
use crate::state::AppState;
use crate::storage::SessionStore;
use crate::utils::test_email;

/// Owns the current session. Every change goes through `publish`, which is
/// the auth-state-change notification the rest of the app reacts to.
pub struct SessionTracker {
    auth: Arc<dyn AuthGateway>,
    state: Arc<AppState>,
    store: Option<SessionStore>,
}

impl SessionTracker {
    pub fn new(auth: Arc<dyn AuthGateway>, state: Arc<AppState>, store: Option<SessionStore>) -> Self {
        Self { auth, state, store }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state.session.get_cloned()
    }

    pub fn signal(&self) -> impl Signal<Item=Option<Session>> {
        self.state.session.signal_cloned()
    }

    /// Picks up the session persisted by a previous run, refreshing it first
    /// when its access token has already expired.
    pub async fn restore(&self) {
        let Some(store) = &self.store else { return };
        let Some(stored) = store.load().await else { return };

        if !stored.expires_within(Duration::zero(), Utc::now()) {
            tracing::info!("restored session for {}", stored.email());
            self.publish(Some(stored)).await;
            return;
        }
        match self.auth.refresh(&stored.refresh_token).await {
            Ok(session) => {
                tracing::info!("restored and refreshed session for {}", session.email());
                self.publish(Some(session)).await;
            }
            Err(err) => {
                tracing::warn!("stored session could not be refreshed: {err}");
                self.publish(None).await;
            }
        }
    }

    /// Asks the provider to mail a single-use login link (and code) to `email`.
    /// The session does not change until the link is confirmed.
    pub async fn sign_in(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim();
        if !test_email(email) {
            return Err(AppError::AuthRequest(RemoteError::Rejected(format!("invalid email address {email:?}"))));
        }
        self.auth.send_magic_link(email).await.map_err(AppError::AuthRequest)?;
        tracing::info!("login link requested for {email}");
        self.state.alert(ALERT_CHECK_EMAIL);
        Ok(())
    }

    /// Completes sign-in with the one-time code from the login mail.
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.confirm(VerifyRequest::code(email.trim(), code.trim())).await
    }

    /// Completes sign-in with the `token_hash` carried by the login link.
    pub async fn verify_link(&self, token_hash: &str) -> Result<(), AppError> {
        self.confirm(VerifyRequest::link(token_hash.trim())).await
    }

    async fn confirm(&self, request: VerifyRequest) -> Result<(), AppError> {
        let session = self.auth.verify(&request).await.map_err(AppError::AuthRequest)?;
        tracing::info!("signed in as {}", session.email());
        self.publish(Some(session)).await;
        Ok(())
    }

    /// Exchanges the refresh token when the access token expires within
    /// `margin`. Returns whether a new session was published. A failed
    /// refresh keeps the session until its access token has expired, after
    /// that it is dropped.
    pub async fn refresh_if_expiring(&self, margin: Duration) -> Result<bool, AppError> {
        let Some(current) = self.current_session() else { return Ok(false) };
        if !current.expires_within(margin, Utc::now()) {
            return Ok(false);
        }
        let refreshed = self.auth.refresh(&current.refresh_token).await;
        // signed out or switched user while the refresh was in flight
        if self.current_session().map(|s| s.owner_id()) != Some(current.owner_id()) {
            return Ok(false);
        }
        let session = match refreshed {
            Ok(session) => session,
            Err(err) => {
                if current.expires_within(Duration::zero(), Utc::now()) {
                    tracing::warn!("session for {} expired and could not be refreshed: {err}", current.email());
                    self.publish(None).await;
                }
                return Err(AppError::AuthRequest(err));
            }
        };
        tracing::debug!("session refreshed");
        self.publish(Some(session)).await;
        Ok(true)
    }

    /// Ends the session at the provider, then locally. When the provider no
    /// longer knows the token (401, 403, 404) there is nothing left to end
    /// remotely and the local session is cleared anyway.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let Some(current) = self.current_session() else { return Ok(()) };
        match self.auth.sign_out(&current.access_token).await {
            Ok(()) => {}
            Err(RemoteError::Status { status: 401 | 403 | 404, message }) => {
                tracing::warn!("provider no longer accepts the session ({message}), signing out locally");
            }
            Err(err) => return Err(AppError::AuthRequest(err)),
        }
        tracing::info!("signed out {}", current.email());
        self.publish(None).await;
        Ok(())
    }

    async fn publish(&self, session: Option<Session>) {
        if let Some(store) = &self.store {
            let saved = match &session {
                Some(session) => store.save(session).await,
                None => store.clear().await,
            };
            if let Err(err) = saved {
                tracing::warn!("session file: {err}");
            }
        }
        self.state.session.set(session);
    }
}
