use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use shared::types::{NewNote, Note, Session};

use crate::constants::ALERT_DELETE_FAILED;
use crate::error::AppError;
use crate::gateway::NotesGateway;
use crate::state::AppState;
use crate::types::{LoadOutcome, SyncState};

/// Client-side cache of the owner's notes, newest first.
///
/// The list is rebuilt wholesale by `load` and patched optimistically by
/// `add` and `remove`. Every `load` takes a ticket from `generation`; a
/// response is applied only while its ticket is still the latest, so an
/// older load finishing late cannot overwrite a newer one. `deactivate`
/// also bumps the counter, which voids loads started under a previous session.
///
/// Writes are not voided, since the remote side has already acted, but
/// their local patch is applied only if no `deactivate` happened while they
/// were in flight (`epoch`) and the session owner is unchanged.
pub struct NoteSync {
    gateway: Arc<dyn NotesGateway>,
    state: Arc<AppState>,
    generation: AtomicU64,
    epoch: AtomicU64,
}

impl NoteSync {
    pub fn new(gateway: Arc<dyn NotesGateway>, state: Arc<AppState>) -> Self {
        Self {
            gateway,
            state,
            generation: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    fn session(&self) -> Result<Session, AppError> {
        self.state.session.get_cloned().ok_or(AppError::NoSession)
    }

    fn still_owned(&self, epoch: u64, owner: Uuid) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
            && self.state.session.lock_ref().as_ref().map(Session::owner_id) == Some(owner)
    }

    pub async fn load(&self) -> LoadOutcome {
        let Ok(session) = self.session() else { return LoadOutcome::Idle };
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.sync.set_neq(SyncState::Loading);

        let result = self.gateway.select(&session).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!("load #{ticket} superseded, response dropped");
            return LoadOutcome::Stale;
        }
        self.state.sync.set_neq(SyncState::Synced);
        match result {
            Ok(rows) => {
                let owner = session.owner_id();
                let mut rows = rows.into_iter().filter(|note| note.user_id == owner).collect::<Vec<_>>();
                rows.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at));
                let count = rows.len();
                self.state.notes.lock_mut().replace_cloned(rows);
                tracing::debug!("load #{ticket}: {count} notes");
                LoadOutcome::Applied(count)
            }
            Err(err) => {
                tracing::warn!("load #{ticket} failed, keeping previous list: {err}");
                LoadOutcome::Failed(AppError::Query(err))
            }
        }
    }

    /// Creates a note from `text`. Blank text is ignored. On success the
    /// server's row goes to the head of the list and the draft is cleared;
    /// on failure neither list nor draft change. A row that arrives after the
    /// session moved on is returned but not shown.
    pub async fn add(&self, text: &str) -> Result<Option<Note>, AppError> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let session = self.session()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let new_note = NewNote { user_id: session.owner_id(), content: content.to_string() };

        let note = self.gateway.insert(&session, &new_note).await.map_err(|err| {
            tracing::warn!("add failed: {err}");
            AppError::Write(err)
        })?;

        {
            let mut notes = self.state.notes.lock_mut();
            if !self.still_owned(epoch, session.owner_id()) {
                tracing::info!("note {} created after the session changed, list left alone", note.id);
                return Ok(Some(note));
            }
            // a reload triggered by the insert may already have brought it in
            notes.retain(|row| row.id != note.id);
            notes.insert_cloned(0, note.clone());
        }
        self.state.draft.set(String::new());
        Ok(Some(note))
    }

    /// `add` of the current draft.
    pub async fn submit(&self) -> Result<Option<Note>, AppError> {
        let draft = self.state.draft.get_cloned();
        self.add(&draft).await
    }

    /// Removes the note locally right away, then asks the service to delete
    /// it. If that fails the note is put back and an alert is queued.
    pub async fn remove(&self, id: i64) -> Result<(), AppError> {
        let session = self.session()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let removed = {
            let mut notes = self.state.notes.lock_mut();
            notes.iter().position(|row| row.id == id).map(|index| (index, notes.remove(index)))
        };

        match self.gateway.delete(&session, id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!("delete of {id} failed: {err}");
                if let Some((index, note)) = removed {
                    self.put_back(index, note, epoch, session.owner_id());
                }
                self.state.alert(&format!("{ALERT_DELETE_FAILED}{err}"));
                Err(AppError::Write(err))
            }
        }
    }

    /// Compensating insert for a failed delete. The note returns to its old
    /// index if the neighbours there still respect the ordering, which
    /// restores an untouched list exactly; otherwise it goes to its ordered
    /// place. Entries added in the meantime are kept. Nothing is put back
    /// into a list that was cleared or handed to another owner meanwhile.
    fn put_back(&self, index: usize, note: Note, epoch: u64, owner: Uuid) {
        let mut notes = self.state.notes.lock_mut();
        if !self.still_owned(epoch, owner) {
            tracing::debug!("session changed during delete of {}, not restoring it", note.id);
            return;
        }
        if notes.iter().any(|row| row.id == note.id) {
            return;
        }
        let fits = |at: usize| {
            (at == 0 || notes[at - 1].inserted_at >= note.inserted_at)
                && (at == notes.len() || notes[at].inserted_at <= note.inserted_at)
        };
        let at = if index <= notes.len() && fits(index) {
            index
        } else {
            notes.iter().position(|row| row.inserted_at < note.inserted_at).unwrap_or(notes.len())
        };
        notes.insert_cloned(at, note);
    }

    /// Back to idle: in-flight loads are voided and the list is emptied.
    pub fn deactivate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.notes.lock_mut().clear();
        self.state.sync.set_neq(SyncState::Idle);
    }
}
