//! Class registry
//!
//! JSON object mapping opaque keys to class names. The class at model
//! output index `i` is the `i`-th entry in sorted key order (plain string
//! ordering, so `"10"` sorts before `"2"`); this must match the order used
//! at training time.

use sndcls_common::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Key → class name mapping, iterated in sorted key order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRegistry {
    entries: BTreeMap<String, String>,
}

impl ClassRegistry {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| Error::Registry(format!("Invalid class registry: {}", e)))?;
        Ok(Self { entries })
    }

    /// Class names ordered by sorted key
    pub fn class_names(&self) -> Vec<String> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail unless the registry has exactly one entry per model output
    pub fn ensure_width(&self, num_classes: usize) -> Result<()> {
        if self.len() != num_classes {
            return Err(Error::Registry(format!(
                "registry has {} classes but the model outputs {}",
                self.len(),
                num_classes
            )));
        }
        Ok(())
    }
}

struct CachedRegistry {
    modified: SystemTime,
    registry: Arc<ClassRegistry>,
}

/// Read-through cache of a registry file, invalidated when its mtime changes
pub struct RegistryCache {
    path: PathBuf,
    cached: RwLock<Option<CachedRegistry>>,
}

impl RegistryCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Current registry, re-read from disk only if the file changed
    pub async fn get(&self) -> Result<Arc<ClassRegistry>> {
        let modified = tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| {
                Error::Registry(format!("Failed to stat {}: {}", self.path.display(), e))
            })?;

        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.modified == modified {
                debug!("Class registry cache hit");
                return Ok(cached.registry.clone());
            }
        }

        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Registry(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let registry = Arc::new(ClassRegistry::from_json_str(&content)?);

        *self.cached.write().await = Some(CachedRegistry {
            modified,
            registry: registry.clone(),
        });
        info!(
            "Class registry loaded from {} ({} classes)",
            self.path.display(),
            registry.len()
        );

        Ok(registry)
    }
}
