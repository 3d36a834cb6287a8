//! Key→JSON file store for task records and artifacts. Write-through only
//! — there is no mid-flight resume, so writes exist purely for
//! observability after the fact.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PersistenceError, PersistenceResult};

#[derive(Debug, Clone)]
pub struct PersistenceStore {
    root: PathBuf,
}

impl PersistenceStore {
    pub async fn new(root: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| PersistenceError::Io {
                path: root.display().to_string(),
                source,
            })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Serialize `value` to `<key>.tmp.<timestamp_nanos>`, then rename over
    /// `<key>.json`. A crash before the rename leaves the prior value, if
    /// any, untouched.
    pub async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> PersistenceResult<()> {
        let final_path = self.path_for(key);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let tmp_path = self.root.join(format!("{key}.tmp.{nanos}"));

        let serialized = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Serialize {
            key: key.to_string(),
            source,
        })?;

        if let Some(parent) = tmp_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        tokio::fs::write(&tmp_path, &serialized)
            .await
            .map_err(|source| PersistenceError::Io {
                path: tmp_path.display().to_string(),
                source,
            })?;

        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: final_path.display().to_string(),
                source,
            })?;

        Ok(())
    }

    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> PersistenceResult<T> {
        let path = self.path_for(key);
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: path.display().to_string(),
                source,
            })?;
        serde_json::from_slice(&raw).map_err(|source| PersistenceError::Deserialize {
            key: key.to_string(),
            source,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
