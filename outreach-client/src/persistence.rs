//! Session-scoped persistence for artifacts relayed between stages.
//!
//! One JSON file per session id holds a flat map of text values. Writes go
//! straight to disk so a reopened session sees them; a different session id
//! never does. The service stays the source of truth; this is a relay.

use outreach_core::{CampaignDraftMetadata, CampaignId, ContactRow};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Fixed keys of the workflow store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    UploadPreview,
    UploadMeta,
    CampaignId,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::UploadPreview => "upload-preview",
            StoreKey::UploadMeta => "upload-meta",
            StoreKey::CampaignId => "campaign-id",
        }
    }

    pub fn all() -> &'static [StoreKey] {
        &[StoreKey::UploadPreview, StoreKey::UploadMeta, StoreKey::CampaignId]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),
    #[error("Session store lock poisoned")]
    LockPoisoned,
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}

#[derive(Debug)]
pub struct WorkflowStore {
    session_id: String,
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl WorkflowStore {
    /// Open (or start) the store for `session_id` under `session_dir`.
    pub fn open(session_dir: &Path, session_id: &str) -> Result<Self, StoreError> {
        validate_session_id(session_id)?;
        let path = session_dir.join(format!("{}.json", session_id));
        let values = load(&path)?;
        tracing::debug!(session_id, path = %path.display(), keys = values.len(), "Workflow store opened");
        Ok(Self {
            session_id: session_id.to_string(),
            path,
            values: RwLock::new(values),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw text stored under `key`.
    pub fn get_raw(&self, key: StoreKey) -> Option<String> {
        match self.values.read() {
            Ok(values) => values.get(key.as_str()).cloned(),
            Err(_) => {
                tracing::error!(key = key.as_str(), "Workflow store lock poisoned on read");
                None
            }
        }
    }

    /// Decoded value under `key`. Absent and undecodable values both read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: StoreKey) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "Discarding undecodable store value");
                None
            }
        }
    }

    pub fn set_raw(&self, key: StoreKey, value: String) -> Result<(), StoreError> {
        self.write_through(|values| {
            values.insert(key.as_str().to_string(), value);
        })
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        self.set_raw(key, text)
    }

    pub fn clear(&self, key: StoreKey) -> Result<(), StoreError> {
        if self.get_raw(key).is_none() {
            return Ok(());
        }
        self.write_through(|values| {
            values.remove(key.as_str());
        })
    }

    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.write_through(BTreeMap::clear)
    }

    /// Record the confirmed campaign and drop the upload artifacts it consumed,
    /// in one write.
    pub fn commit_campaign(&self, campaign_id: CampaignId) -> Result<(), StoreError> {
        self.write_through(|values| {
            values.insert(StoreKey::CampaignId.as_str().to_string(), campaign_id.to_string());
            values.remove(StoreKey::UploadPreview.as_str());
            values.remove(StoreKey::UploadMeta.as_str());
        })
    }

    /// Forget everything and delete the backing file.
    pub fn destroy(&self) -> Result<(), StoreError> {
        let mut values = self.values.write()?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        values.clear();
        Ok(())
    }

    /// Apply `change` to a copy, persist it, and only then make it visible.
    fn write_through<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut values = self.values.write()?;
        let mut next = values.clone();
        change(&mut next);
        save(&self.path, &next)?;
        *values = next;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------------

    pub fn preview_rows(&self) -> Option<Vec<ContactRow>> {
        self.get(StoreKey::UploadPreview)
    }

    pub fn set_preview_rows(&self, rows: &[ContactRow]) -> Result<(), StoreError> {
        self.set(StoreKey::UploadPreview, rows)
    }

    pub fn draft_metadata(&self) -> Option<CampaignDraftMetadata> {
        self.get(StoreKey::UploadMeta)
    }

    pub fn set_draft_metadata(&self, metadata: &CampaignDraftMetadata) -> Result<(), StoreError> {
        self.set(StoreKey::UploadMeta, metadata)
    }

    /// The confirmed campaign, stored as a stringified integer.
    pub fn campaign_id(&self) -> Option<CampaignId> {
        let raw = self.get_raw(StoreKey::CampaignId)?;
        match raw.parse() {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(value = %raw, error = %err, "Discarding malformed campaign id");
                None
            }
        }
    }

    pub fn set_campaign_id(&self, campaign_id: CampaignId) -> Result<(), StoreError> {
        self.set_raw(StoreKey::CampaignId, campaign_id.to_string())
    }
}

fn validate_session_id(session_id: &str) -> Result<(), StoreError> {
    let valid = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&contents)?)
}

fn save(path: &Path, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(values)?;
    std::fs::write(path, contents)?;
    Ok(())
}
