use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::User;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Session lifecycle notifications broadcast by `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    /// The refresh token was missing or refused; the user must log in again.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: User,
}

impl SessionData {
    /// Whether the session can still authenticate a request, now or after a refresh.
    pub fn is_usable(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }
}

/// On-disk layout: the three well-known keys, each optional.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

impl StoredSession {
    fn from_session(data: &SessionData) -> Self {
        Self {
            token: data.access_token.clone(),
            refresh_token: data.refresh_token.clone(),
            user: Some(data.user.clone()),
        }
    }

    /// A stored user plus at least one token restores the session.
    fn into_session(self) -> Option<SessionData> {
        let data = SessionData {
            access_token: self.token,
            refresh_token: self.refresh_token,
            user: self.user?,
        };
        data.is_usable().then_some(data)
    }
}

/// Process-wide holder of the current session.
///
/// Readers always see either no session or a complete one. Every write
/// updates the in-memory copy first and then the session file, so an `Err`
/// from a mutation means only the file is stale. The file is replaced by
/// rename so a crash never leaves a half-written session behind.
pub struct SessionStore {
    path: Option<PathBuf>,
    data: RwLock<Option<SessionData>>,
}

impl SessionStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(None),
        }
    }

    /// Open the store persisted in `dir`, restoring any usable session.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(SESSION_FILE);
        let data = Self::load(&path)?;
        if let Some(ref session) = data {
            debug!(user = %session.user.email, "Restored saved session");
        }
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    fn load(path: &Path) -> Result<Option<SessionData>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(stored) => Ok(stored.into_session()),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<SessionData>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<SessionData>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> Option<SessionData> {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().and_then(|d| d.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().as_ref().and_then(|d| d.refresh_token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|d| d.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Start a new session, replacing whatever was there.
    pub fn set(&self, user: User, access_token: String, refresh_token: Option<String>) -> Result<()> {
        let data = SessionData {
            access_token: Some(access_token),
            refresh_token,
            user,
        };
        let mut guard = self.write();
        *guard = Some(data);
        self.persist(guard.as_ref())
    }

    /// Store tokens from a refresh. The refresh token is only replaced when
    /// the server rotated it. Returns false if there is no session to update.
    pub fn update_tokens(&self, access_token: String, refresh_token: Option<String>) -> Result<bool> {
        let mut guard = self.write();
        let Some(current) = guard.as_mut() else {
            return Ok(false);
        };
        current.access_token = Some(access_token);
        if let Some(rotated) = refresh_token {
            current.refresh_token = Some(rotated);
        }
        self.persist(guard.as_ref())?;
        Ok(true)
    }

    /// Remove the session. Returns whether there was one; clearing an empty
    /// store changes nothing.
    ///
    /// A session file that cannot be removed is restored on the next start
    /// and ends at its first rejected refresh.
    pub fn clear(&self) -> Result<bool> {
        let mut guard = self.write();
        let removed = guard.take().is_some();
        self.persist(None)?;
        Ok(removed)
    }

    fn persist(&self, data: Option<&SessionData>) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        match data {
            Some(data) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let contents = serde_json::to_string_pretty(&StoredSession::from_session(data))?;
                let tmp = path.with_extension("json.tmp");
                std::fs::write(&tmp, contents).context("Failed to write session file")?;
                std::fs::rename(&tmp, path).context("Failed to replace session file")?;
            }
            None => {
                if path.exists() {
                    std::fs::remove_file(path).context("Failed to remove session file")?;
                }
            }
        }
        Ok(())
    }
}
