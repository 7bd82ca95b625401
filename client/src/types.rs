use crate::error::AppError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Loading,
    Synced,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Other,
}

impl From<&str> for ChangeKind {
    fn from(text: &str) -> Self {
        match text {
            "INSERT" => ChangeKind::Insert,
            "UPDATE" => ChangeKind::Update,
            "DELETE" => ChangeKind::Delete,
            _ => ChangeKind::Other,
        }
    }
}

/// A row-level change on the watched table. The payload is not consumed
/// beyond its kind: any change means "reload".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: String,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Applied(usize),
    /// A later load was started while this one was in flight.
    Stale,
    Failed(AppError),
    Idle,
}
