use std::sync::Weak;
use std::time::Duration;

use crate::app::NotesApp;
use crate::constants::REFRESH_MARGIN_SECS;

/// Keeps the session alive: exchanges the refresh token shortly before the
/// access token expires. Ends once the app is gone.
pub async fn run_tasks(app: Weak<NotesApp>, period: Duration) {
    let mut interval_timer = tokio::time::interval(period);
    loop {
        interval_timer.tick().await;
        let Some(app) = app.upgrade() else { break };
        match app.tracker.refresh_if_expiring(chrono::Duration::seconds(REFRESH_MARGIN_SECS)).await {
            Ok(true) => tracing::info!("access token refreshed"),
            Ok(false) => {}
            Err(err) => tracing::warn!("session refresh: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::testing::{session_for, wait_until, FakeAuth, FakeFeed, FakeNotes};

    use super::*;

    #[tokio::test]
    async fn refreshes_expiring_session_and_stops_with_app() {
        let auth = Arc::new(FakeAuth::default());
        let app = NotesApp::new(auth.clone(), Arc::new(FakeNotes::default()), Arc::new(FakeFeed::default()), None);
        let expiring = session_for("me@example.com", Some(Utc::now().timestamp() + 5));
        app.state.session.set(Some(expiring.clone()));

        let task = tokio::spawn(run_tasks(Arc::downgrade(&app), Duration::from_millis(10)));
        let counted = auth.clone();
        assert!(wait_until(|| counted.refreshes() >= 1).await);
        let current = app.tracker.current_session().unwrap();
        assert_ne!(current.access_token, expiring.access_token);

        drop(app);
        assert!(tokio::time::timeout(Duration::from_secs(1), task).await.is_ok());
    }
}
