use std::io;
use std::path::PathBuf;

use tokio::fs;

use shared::types::Session;

/// Keeps the last session on disk so a restart does not need a new login link.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn load(&self) -> Option<Session> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::warn!("stored session {} unreadable: {err}", self.path.display());
                    None
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!("stored session {}: {err}", self.path.display());
                None
            }
        }
    }

    pub async fn save(&self, session: &Session) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let text = serde_json::to_vec(session).map_err(io::Error::other)?;
        fs::write(&self.path, text).await
    }

    pub async fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path).await {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
