use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;

use crate::constants::{CONFIG_PATH, ENV_ANON_KEY, ENV_CONFIG_PATH, ENV_URL};
use crate::error::AppError;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl ClientConfig {
    /// Reads the config file named by `NOTES_CONFIG` (or `env.json`), then
    /// lets the environment override the connection settings.
    pub fn load() -> Result<Self, AppError> {
        let path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| CONFIG_PATH.to_string());
        let config = if Path::new(&path).exists() {
            Self::from_file(Path::new(&path))?
        } else {
            tracing::info!("config file {path} not found, using environment only");
            Self::default()
        };
        config.with_overrides(|key| std::env::var(key).ok()).validated()
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        serde_json::from_str::<ClientConfig>(text).map_err(|err| AppError::Config(err.to_string()))
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.is_empty()) {
            self.url = url;
        }
        if let Some(key) = lookup(ENV_ANON_KEY).filter(|v| !v.is_empty()) {
            self.anon_key = key;
        }
        self
    }

    pub fn validated(mut self) -> Result<Self, AppError> {
        self.url = self.url.trim().trim_end_matches('/').to_string();
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(AppError::Config(format!("url must be http(s), got {:?}", self.url)));
        }
        if self.anon_key.trim().is_empty() {
            return Err(AppError::Config("anon_key is empty".to_string()));
        }
        Ok(self)
    }

    pub fn log_level(&self) -> Level {
        self.log_level
            .as_deref()
            .and_then(|level| Level::from_str(level).ok())
            .unwrap_or(Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_json_and_normalizes_url() {
        let config = ClientConfig::from_json(r#"{"url":"https://abc.supabase.co/","anon_key":"k","log_level":"debug"}"#)
            .and_then(ClientConfig::validated)
            .unwrap();
        assert_eq!(config.url, "https://abc.supabase.co");
        assert_eq!(config.log_level(), Level::DEBUG);
        assert!(config.session_file.is_none());
    }

    #[test]
    fn environment_wins_over_file() {
        let env = HashMap::from([(ENV_URL, "http://localhost:54321"), (ENV_ANON_KEY, "")]);
        let config = ClientConfig { url: "https://file".to_string(), anon_key: "file-key".to_string(), ..ClientConfig::default() }
            .with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.url, "http://localhost:54321");
        assert_eq!(config.anon_key, "file-key");
    }

    #[test]
    fn rejects_missing_connection_settings() {
        assert!(matches!(ClientConfig::default().validated(), Err(AppError::Config(_))));
        let no_key = ClientConfig { url: "https://x".to_string(), ..ClientConfig::default() };
        assert!(matches!(no_key.validated(), Err(AppError::Config(_))));
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let config = ClientConfig { log_level: Some("loud".to_string()), ..ClientConfig::default() };
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"url":"https://x","anon_key":"k","session_file":"/tmp/s.json"}}"#).unwrap();
        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/s.json")));
    }
}
