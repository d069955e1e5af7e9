use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::CoreError;

/// Credential file name inside the linkwire config directory
pub const CREDENTIAL_FILE: &str = "tokenStore.json";

/// The one delegated credential held by the process.
///
/// Field names on disk match the token store written by earlier releases.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "userId")]
    pub subject_id: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at_epoch_millis: i64,
}

impl CredentialRecord {
    /// A credential expiring exactly at `now_millis` is already expired.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expires_at_epoch_millis <= now_millis
    }

    fn is_complete(&self) -> bool {
        !self.subject_id.is_empty() && !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("subject_id", &self.subject_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at_epoch_millis", &self.expires_at_epoch_millis)
            .finish()
    }
}

/// File-backed store for the single credential record.
///
/// The in-memory copy is authoritative; the file is a mirror written after
/// every mutation and read once at startup.
pub struct CredentialStore {
    path: PathBuf,
    current: RwLock<Option<CredentialRecord>>,
    /// Reason the file is behind memory, until the next successful write.
    unsaved: RwLock<Option<String>>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            current: RwLock::new(None),
            unsaved: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore the record from disk.
    ///
    /// A missing, unreadable or partial file means "not authenticated yet"
    /// and is reported as `None`, never as an error.
    pub fn load(&self) -> Option<CredentialRecord> {
        let loaded = match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<CredentialRecord>(&contents) {
                Ok(record) if record.is_complete() => Some(record),
                Ok(_) => {
                    warn!(path = %self.path.display(), "Ignoring incomplete credential file");
                    None
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Ignoring unparseable credential file");
                    None
                }
            },
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No credential file loaded");
                None
            }
        };

        if let Some(ref record) = loaded {
            info!(subject = %record.subject_id, "Loaded stored credential");
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = loaded.clone();
        loaded
    }

    /// Replace the record in memory, then mirror it to disk.
    ///
    /// The in-memory update stands even when the write fails.
    pub fn save(&self, record: CredentialRecord) -> Result<(), CoreError> {
        let contents = serde_json::to_string_pretty(&record)
            .map_err(|e| CoreError::Persistence(e.to_string()))?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(record);

        let result = match self.write_file(&contents) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credential file written");
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to write credential file");
                Err(format!("{}: {}", self.path.display(), e))
            }
        };
        *self.unsaved.write().unwrap_or_else(PoisonError::into_inner) = result.clone().err();
        result.map_err(CoreError::Persistence)
    }

    /// `Err(Persistence)` while the in-memory record is newer than the file.
    pub fn durability(&self) -> Result<(), CoreError> {
        match self.unsaved.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(reason) => Err(CoreError::Persistence(reason.clone())),
            None => Ok(()),
        }
    }

    pub fn current(&self) -> Option<CredentialRecord> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whole-file replace: write a sibling temp file, then rename over the target.
    /// The temp file never outlives a failed write.
    fn write_file(&self, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = write_private(&tmp, contents).and_then(|()| std::fs::rename(&tmp, &self.path));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }
}

/// Create (or truncate) `path` readable by the owner only, then write `contents`.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
