use futures_signals::signal::Mutable;
use futures_signals::signal_vec::MutableVec;

use shared::types::{Note, Session};

use crate::types::SyncState;

/// Everything the terminal surface observes. One instance per mounted app,
/// shared between the tracker, the synchronizer and the console.
pub struct AppState {
    pub session: Mutable<Option<Session>>,
    pub notes: MutableVec<Note>,
    pub draft: Mutable<String>,
    pub sync: Mutable<SyncState>,
    pub alerts: MutableVec<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            session: Mutable::new(None),
            notes: MutableVec::new(),
            draft: Mutable::new(String::new()),
            sync: Mutable::new(SyncState::Idle),
            alerts: MutableVec::new(),
        }
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.lock_ref().to_vec()
    }

    pub fn alert(&self, message: &str) {
        tracing::info!("alert: {message}");
        self.alerts.lock_mut().push_cloned(message.to_string());
    }

    pub fn take_alerts(&self) -> Vec<String> {
        let mut alerts = self.alerts.lock_mut();
        let taken = alerts.to_vec();
        alerts.clear();
        taken
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
