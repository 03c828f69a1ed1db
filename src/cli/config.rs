use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://localhost:3001";

const SESSION_FILE: &str = "session.json";

/// Who the CLI talks to and as whom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub server: String,
    pub token: Option<String>,
    pub email: Option<String>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: None,
            email: None,
            logged_in_at: None,
        }
    }
}

impl Session {
    pub fn new(server: String, token: String, email: String) -> Self {
        Self {
            server,
            token: Some(token),
            email: Some(email),
            logged_in_at: Some(Utc::now()),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("INVOICER_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("invoicer").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Read a JSON file, or `None` when it does not exist yet.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Overwrite a JSON file. Last write wins.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_session(dir: &Path) -> anyhow::Result<Session> {
    Ok(load_json(&dir.join(SESSION_FILE))?.unwrap_or_default())
}

pub fn save_session(dir: &Path, session: &Session) -> anyhow::Result<()> {
    save_json(&dir.join(SESSION_FILE), session)
}

/// Forget the token but keep the server URL.
pub fn clear_session(dir: &Path) -> anyhow::Result<Session> {
    let mut session = load_session(dir)?;
    session.token = None;
    session.email = None;
    session.logged_in_at = None;
    save_session(dir, &session)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_survives_reload_and_logout_keeps_server() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_session(dir.path()).unwrap(), Session::default());

        let session = Session::new("http://api.test".into(), "tok".into(), "a@b.com".into());
        save_session(dir.path(), &session).unwrap();
        assert_eq!(load_session(dir.path()).unwrap(), session);

        let cleared = clear_session(dir.path()).unwrap();
        assert_eq!(cleared.server, "http://api.test");
        assert!(!load_session(dir.path()).unwrap().is_logged_in());
    }
}
