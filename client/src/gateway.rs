use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use shared::types::{NewNote, Note, Session, VerifyRequest};

use crate::error::RemoteError;
use crate::types::ChangeEvent;

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn send_magic_link(&self, email: &str) -> Result<(), RemoteError>;
    async fn verify(&self, request: &VerifyRequest) -> Result<Session, RemoteError>;
    async fn refresh(&self, refresh_token: &str) -> Result<Session, RemoteError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait NotesGateway: Send + Sync {
    /// The owner's notes, newest first.
    async fn select(&self, session: &Session) -> Result<Vec<Note>, RemoteError>;
    async fn insert(&self, session: &Session, note: &NewNote) -> Result<Note, RemoteError>;
    async fn delete(&self, session: &Session, id: i64) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, session: &Session) -> Result<ChangeStream, RemoteError>;
}

/// Change notifications for one session. Dropping the stream tells the
/// connection task to leave the channel and close the socket.
pub struct ChangeStream {
    events: UnboundedReceiverStream<ChangeEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    connection: Option<JoinHandle<()>>,
}

impl ChangeStream {
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self {
            events: UnboundedReceiverStream::new(events),
            shutdown: None,
            connection: None,
        }
    }

    pub fn with_connection(mut self, shutdown: oneshot::Sender<()>, connection: JoinHandle<()>) -> Self {
        self.shutdown = Some(shutdown);
        self.connection = Some(connection);
        self
    }

    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.next().await
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            if shutdown.send(()).is_err() {
                // connection task is already gone
                if let Some(connection) = self.connection.take() {
                    connection.abort();
                }
            }
        }
    }
}
