use std::sync::{Arc, Mutex, Weak};

use futures_signals::signal::SignalExt;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use shared::types::Session;

use crate::gateway::{AuthGateway, ChangeFeed, ChangeStream, NotesGateway};
use crate::notes::NoteSync;
use crate::session::SessionTracker;
use crate::state::AppState;
use crate::storage::SessionStore;

/// Live change subscription for one session. Every notification triggers a
/// full reload. Dropping the guard stops the listener, which drops the
/// stream and closes the connection.
pub struct Subscription {
    owner: Uuid,
    listener: JoinHandle<()>,
}

impl Subscription {
    fn spawn(owner: Uuid, sync: Arc<NoteSync>, mut stream: ChangeStream) -> Self {
        let listener = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                tracing::debug!("remote {:?} on {}, reloading", event.kind, event.table);
                sync.load().await;
            }
            tracing::info!("change subscription for {owner} ended");
        });
        Self { owner, listener }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!("closing change subscription for {}", self.owner);
        self.listener.abort();
    }
}

/// The mounted application: state record, session tracker and synchronizer,
/// with the synchronizer's activation bound to session changes.
pub struct NotesApp {
    pub state: Arc<AppState>,
    pub tracker: SessionTracker,
    pub sync: Arc<NoteSync>,
    feed: Arc<dyn ChangeFeed>,
    subscription: Mutex<Option<Subscription>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl NotesApp {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        notes: Arc<dyn NotesGateway>,
        feed: Arc<dyn ChangeFeed>,
        store: Option<SessionStore>,
    ) -> Arc<Self> {
        let state = Arc::new(AppState::new());
        Arc::new(Self {
            tracker: SessionTracker::new(auth, state.clone(), store),
            sync: Arc::new(NoteSync::new(notes, state.clone())),
            state,
            feed,
            subscription: Mutex::new(None),
            watcher: Mutex::new(None),
        })
    }

    /// Starts following the session: the current value right away, then
    /// every change the tracker publishes.
    pub fn mount(self: &Arc<Self>) {
        let app: Weak<Self> = Arc::downgrade(self);
        let mut sessions = self.tracker.signal().to_stream();
        let watcher = tokio::spawn(async move {
            while let Some(session) = sessions.next().await {
                let Some(app) = app.upgrade() else { break };
                app.on_session_change(session).await;
            }
        });
        if let Ok(mut current) = self.watcher.lock() {
            if let Some(previous) = current.replace(watcher) {
                previous.abort();
            }
        }
    }

    /// Closes the subscription of the previous session, then, for a present
    /// session, subscribes to its changes and loads its notes.
    pub async fn on_session_change(&self, session: Option<Session>) {
        let previous = self.close_subscription();

        let Some(session) = session else {
            self.sync.deactivate();
            return;
        };
        if previous != Some(session.owner_id()) {
            self.sync.deactivate();
        }

        match self.feed.subscribe(&session).await {
            Ok(stream) => {
                // superseded while connecting
                if self.tracker.current_session().as_ref() != Some(&session) {
                    return;
                }
                let subscription = Subscription::spawn(session.owner_id(), self.sync.clone(), stream);
                if let Ok(mut current) = self.subscription.lock() {
                    *current = Some(subscription);
                }
            }
            Err(err) => tracing::error!("realtime subscription failed, changes from other clients will not show: {err}"),
        }
        self.sync.load().await;
    }

    fn close_subscription(&self) -> Option<Uuid> {
        match self.subscription.lock() {
            Ok(mut current) => current.take().map(|subscription| subscription.owner),
            Err(err) => {
                tracing::error!("subscription lock: {err}");
                None
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().map(|current| current.is_some()).unwrap_or(false)
    }

    /// Unmount: stop following the session and release the subscription.
    pub fn shutdown(&self) {
        if let Ok(mut watcher) = self.watcher.lock() {
            if let Some(watcher) = watcher.take() {
                watcher.abort();
            }
        }
        self.close_subscription();
        self.sync.deactivate();
    }
}

impl Drop for NotesApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
