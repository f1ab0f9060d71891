use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Whole-document store for campaign engagement events.
///
/// The document is held in memory and rewritten to disk in full on every
/// mutation. The in-process lock serializes writers inside one process;
/// a second process writing the same file still wins or loses whole-file.
#[derive(Clone)]
pub struct TrackingStore {
    state: Arc<RwLock<TrackingDocument>>,
    path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read tracking data at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("tracking data at {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{message}")]
    Persistence { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenEvent {
    pub tracking_id: String,
    pub opened_at: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub tracking_id: String,
    pub action_name: String,
    pub clicked_at: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribeEvent {
    pub tracking_id: String,
    pub unsubscribed_at: DateTime<Utc>,
}

/// The persisted document. Send records are opaque; their shape belongs
/// to the sender that wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingDocument {
    #[serde(default)]
    pub emails_sent: Vec<Value>,
    #[serde(default)]
    pub opens: Vec<OpenEvent>,
    #[serde(default)]
    pub clicks: Vec<ClickEvent>,
    #[serde(default)]
    pub unsubscribes: Vec<UnsubscribeEvent>,
}

/// Reads the document at `path`. A missing file is an empty document;
/// an unreadable or malformed file is an error.
pub fn load_document(path: &Path) -> Result<TrackingDocument, StoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(TrackingDocument::default());
        }
        Err(error) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: error,
            });
        }
    };

    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl TrackingStore {
    /// Opens the store, loading the persisted document when a path is
    /// given. `None` keeps the document in memory only.
    pub fn open(path: Option<PathBuf>) -> Result<Self, StoreError> {
        let document = match path.as_ref() {
            Some(path) => load_document(path)?,
            None => TrackingDocument::default(),
        };

        Ok(Self {
            state: Arc::new(RwLock::new(document)),
            path,
        })
    }

    pub async fn snapshot(&self) -> TrackingDocument {
        self.state.read().await.clone()
    }

    /// Appends an opaque send record.
    pub async fn record_sent(&self, record: Value) -> Result<(), StoreError> {
        self.mutate(|document| document.emails_sent.push(record))
            .await
    }

    /// Records an email open. First open wins: a tracking id already
    /// present in `opens` is dropped without touching the file. Returns
    /// whether a new event was stored.
    pub async fn record_open(
        &self,
        tracking_id: &str,
        ip: String,
        user_agent: String,
    ) -> Result<bool, StoreError> {
        let snapshot = {
            let mut state = self.state.write().await;
            let already_opened = state
                .opens
                .iter()
                .any(|event| event.tracking_id == tracking_id);
            if already_opened {
                return Ok(false);
            }

            state.opens.push(OpenEvent {
                tracking_id: tracking_id.to_string(),
                opened_at: Utc::now(),
                ip,
                user_agent,
            });
            state.clone()
        };

        self.persist(&snapshot).await?;
        tracing::info!(target: "tracker.store", tracking_id, "recorded email open");
        Ok(true)
    }

    /// Records a link click. Clicks are never deduplicated.
    pub async fn record_click(
        &self,
        tracking_id: &str,
        action_name: &str,
        ip: String,
        user_agent: String,
    ) -> Result<(), StoreError> {
        self.mutate(|document| {
            document.clicks.push(ClickEvent {
                tracking_id: tracking_id.to_string(),
                action_name: action_name.to_string(),
                clicked_at: Utc::now(),
                ip,
                user_agent,
            });
        })
        .await?;

        tracing::info!(target: "tracker.store", tracking_id, action_name, "recorded click");
        Ok(())
    }

    /// Records an unsubscribe. The event is stored for external
    /// consumption; nothing here suppresses future sends.
    pub async fn record_unsubscribe(&self, tracking_id: &str) -> Result<(), StoreError> {
        self.mutate(|document| {
            document.unsubscribes.push(UnsubscribeEvent {
                tracking_id: tracking_id.to_string(),
                unsubscribed_at: Utc::now(),
            });
        })
        .await?;

        tracing::info!(target: "tracker.store", tracking_id, "recorded unsubscribe");
        Ok(())
    }

    async fn mutate<F>(&self, operation: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut TrackingDocument),
    {
        let snapshot = {
            let mut state = self.state.write().await;
            operation(&mut state);
            state.clone()
        };

        self.persist(&snapshot).await
    }

    async fn persist(&self, snapshot: &TrackingDocument) -> Result<(), StoreError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| StoreError::Persistence {
                    message: format!("failed to prepare tracking data directory: {error}"),
                })?;
        }

        let payload =
            serde_json::to_vec_pretty(snapshot).map_err(|error| StoreError::Persistence {
                message: format!("failed to encode tracking data: {error}"),
            })?;

        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|error| StoreError::Persistence {
                message: format!("failed to write tracking data: {error}"),
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|error| StoreError::Persistence {
                message: format!("failed to finalize tracking data: {error}"),
            })?;

        Ok(())
    }
}
