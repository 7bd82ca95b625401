//! In-memory stand-ins for the hosted service, used by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use shared::types::{AuthUser, NewNote, Note, Session, VerifyRequest};

use crate::error::RemoteError;
use crate::gateway::{AuthGateway, ChangeFeed, ChangeStream, NotesGateway};
use crate::types::{ChangeEvent, ChangeKind};

pub fn note(id: i64, content: &str, secs: i64) -> Note {
    Note {
        id,
        user_id: Uuid::nil(),
        content: content.to_string(),
        inserted_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

pub fn session_for(email: &str, expires_at: Option<i64>) -> Session {
    Session {
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Uuid::new_v4().to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at,
        user: AuthUser { id: Uuid::new_v4(), email: Some(email.to_string()) },
    }
}

fn failure(message: &Option<String>) -> Result<(), RemoteError> {
    match message {
        Some(message) => Err(RemoteError::Status { status: 503, message: message.clone() }),
        None => Ok(())
    }
}

/// Polls `condition` while letting spawned tasks run, for at most a second.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// === auth

#[derive(Default)]
struct AuthLog {
    links: Vec<String>,
    refreshes: usize,
    sign_outs: usize,
    failure: Option<(u16, String)>,
}

impl AuthLog {
    fn check(&self) -> Result<(), RemoteError> {
        match &self.failure {
            Some((status, message)) => Err(RemoteError::Status { status: *status, message: message.clone() }),
            None => Ok(())
        }
    }
}

pub struct FakeAuth {
    user_id: Uuid,
    log: Mutex<AuthLog>,
}

impl Default for FakeAuth {
    fn default() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            log: Mutex::new(AuthLog::default()),
        }
    }
}

impl FakeAuth {
    pub fn fail_with(&self, message: &str) {
        self.fail_with_status(503, message);
    }

    pub fn fail_with_status(&self, status: u16, message: &str) {
        self.log.lock().unwrap().failure = Some((status, message.to_string()));
    }

    pub fn links_sent(&self) -> Vec<String> {
        self.log.lock().unwrap().links.clone()
    }

    pub fn refreshes(&self) -> usize {
        self.log.lock().unwrap().refreshes
    }

    pub fn sign_outs(&self) -> usize {
        self.log.lock().unwrap().sign_outs
    }

    fn issue(&self, email: Option<String>) -> Session {
        let mut session = session_for(&email.unwrap_or_else(|| "me@example.com".to_string()), Some(Utc::now().timestamp() + 3600));
        session.user.id = self.user_id;
        session
    }
}

#[async_trait]
impl AuthGateway for FakeAuth {
    async fn send_magic_link(&self, email: &str) -> Result<(), RemoteError> {
        let mut log = self.log.lock().unwrap();
        log.check()?;
        log.links.push(email.to_string());
        Ok(())
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<Session, RemoteError> {
        self.log.lock().unwrap().check()?;
        Ok(self.issue(request.email.clone()))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, RemoteError> {
        let mut log = self.log.lock().unwrap();
        log.refreshes += 1;
        log.check()?;
        drop(log);
        Ok(self.issue(None))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), RemoteError> {
        let mut log = self.log.lock().unwrap();
        log.check()?;
        log.sign_outs += 1;
        Ok(())
    }
}

// === notes table

#[derive(Default)]
struct Table {
    rows: Vec<Note>,
    select_calls: usize,
    fail_select: Option<String>,
    fail_insert: Option<String>,
    fail_delete: Option<String>,
    held_selects: VecDeque<oneshot::Receiver<()>>,
    held_inserts: VecDeque<oneshot::Receiver<()>>,
    held_deletes: VecDeque<oneshot::Receiver<()>>,
}

/// Behaves like the table without row-level security: `select` returns
/// every row, newest first.
#[derive(Default)]
pub struct FakeNotes {
    table: Mutex<Table>,
}

impl FakeNotes {
    pub fn with_rows(rows: Vec<Note>) -> Self {
        Self {
            table: Mutex::new(Table { rows, ..Table::default() }),
        }
    }

    pub fn rows(&self) -> Vec<Note> {
        self.table.lock().unwrap().rows.clone()
    }

    pub fn push_row(&self, row: Note) {
        self.table.lock().unwrap().rows.push(row);
    }

    pub fn select_calls(&self) -> usize {
        self.table.lock().unwrap().select_calls
    }

    pub fn fail_select(&self, message: Option<&str>) {
        self.table.lock().unwrap().fail_select = message.map(str::to_string);
    }

    pub fn fail_insert(&self, message: Option<&str>) {
        self.table.lock().unwrap().fail_insert = message.map(str::to_string);
    }

    pub fn fail_delete(&self, message: Option<&str>) {
        self.table.lock().unwrap().fail_delete = message.map(str::to_string);
    }

    /// The next `select` answers only after the returned sender fires.
    /// Its rows are read when the call is made.
    pub fn hold_next_select(&self) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        self.table.lock().unwrap().held_selects.push_back(held);
        release
    }

    pub fn hold_next_insert(&self) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        self.table.lock().unwrap().held_inserts.push_back(held);
        release
    }

    pub fn hold_next_delete(&self) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        self.table.lock().unwrap().held_deletes.push_back(held);
        release
    }
}

#[async_trait]
impl NotesGateway for FakeNotes {
    async fn select(&self, _session: &Session) -> Result<Vec<Note>, RemoteError> {
        let (result, held) = {
            let mut table = self.table.lock().unwrap();
            table.select_calls += 1;
            let result = failure(&table.fail_select).map(|_| {
                let mut rows = table.rows.clone();
                rows.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at));
                rows
            });
            (result, table.held_selects.pop_front())
        };
        if let Some(held) = held {
            held.await.ok();
        }
        result
    }

    async fn insert(&self, _session: &Session, new_note: &NewNote) -> Result<Note, RemoteError> {
        let held = self.table.lock().unwrap().held_inserts.pop_front();
        if let Some(held) = held {
            held.await.ok();
        }
        let mut table = self.table.lock().unwrap();
        failure(&table.fail_insert)?;
        let id = table.rows.iter().map(|row| row.id).max().unwrap_or_default() + 1;
        let row = Note {
            id,
            user_id: new_note.user_id,
            content: new_note.content.clone(),
            inserted_at: Utc::now(),
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, _session: &Session, id: i64) -> Result<(), RemoteError> {
        let held = self.table.lock().unwrap().held_deletes.pop_front();
        if let Some(held) = held {
            held.await.ok();
        }
        let mut table = self.table.lock().unwrap();
        failure(&table.fail_delete)?;
        table.rows.retain(|row| row.id != id);
        Ok(())
    }
}

// === realtime

#[derive(Default)]
pub struct FakeFeed {
    subscribers: Mutex<Vec<(Uuid, mpsc::UnboundedSender<ChangeEvent>)>>,
    failure: Mutex<Option<String>>,
}

impl FakeFeed {
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(str::to_string);
    }

    pub fn subscriptions(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Owners with a subscription that has not been dropped yet.
    pub fn active(&self) -> Vec<Uuid> {
        self.subscribers.lock().unwrap()
            .iter()
            .filter(|(_, sender)| !sender.is_closed())
            .map(|(owner, _)| *owner)
            .collect()
    }

    /// Sends a change to every live subscription and returns how many got it.
    pub fn emit(&self, kind: ChangeKind) -> usize {
        self.subscribers.lock().unwrap()
            .iter()
            .filter(|(_, sender)| sender.send(ChangeEvent { kind, table: "notes".to_string() }).is_ok())
            .count()
    }

    /// Ends every live subscription from the service side.
    pub fn hang_up(&self) {
        self.subscribers.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChangeFeed for FakeFeed {
    async fn subscribe(&self, session: &Session) -> Result<ChangeStream, RemoteError> {
        failure(&self.failure.lock().unwrap())?;
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push((session.owner_id(), sender));
        Ok(ChangeStream::new(receiver))
    }
}
