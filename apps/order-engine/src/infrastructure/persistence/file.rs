//! JSON file order store.
//!
//! One `<order-id>.json` file per order under a directory. Writes go to a
//! temporary file that is then renamed over the target, so a crash never
//! leaves a half-written record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::application::ports::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderId};

/// File-backed implementation of `OrderStore`.
#[derive(Debug, Clone)]
pub struct JsonFileOrderStore {
    dir: PathBuf,
}

impl JsonFileOrderStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| StoreError::Unavailable {
            message: format!("cannot create {}: {e}", dir.display()),
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the order files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &OrderId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read_order(path: &Path) -> Result<Option<Order>, StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Unavailable {
                    message: format!("cannot read {}: {e}", path.display()),
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                message: format!("{}: {e}", path.display()),
            })
    }
}

fn unavailable(e: &std::io::Error) -> StoreError {
    StoreError::Unavailable {
        message: e.to_string(),
    }
}

#[async_trait]
impl OrderStore for JsonFileOrderStore {
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(order).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;
        let target = self.path_for(&order.id());
        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, bytes).await.map_err(|e| unavailable(&e))?;
        fs::rename(&tmp, &target).await.map_err(|e| unavailable(&e))
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        Self::read_order(&self.path_for(id)).await
    }

    async fn find_active(&self) -> Result<Vec<Order>, StoreError> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| unavailable(&e))?;
        let mut active = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(|e| unavailable(&e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_order(&path).await {
                Ok(Some(order)) if !order.status().is_terminal() => active.push(order),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable order file"),
            }
        }
        Ok(active)
    }
}
