//! Registry of configured execution backends with one active at a time.
//!
//! `select` is the only mutator. The current name sits behind a `RwLock`
//! so `current()` reads are linearizable with respect to selections and
//! never observe a name that is not a configured key.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{info, warn};

use super::ExecutionBackend;

/// One row of `list()` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStatus {
    pub name: String,
    pub is_current: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("api {0} not available")]
    UnknownBackend(String),

    #[error("no backends configured")]
    Empty,
}

pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ExecutionBackend>>,
    current: RwLock<String>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish()
    }
}

impl BackendRegistry {
    /// Build a registry from named backends plus the initially active name.
    pub fn new(
        backends: HashMap<String, Arc<dyn ExecutionBackend>>,
        initial: &str,
    ) -> Result<Self, RegistryError> {
        if backends.is_empty() {
            return Err(RegistryError::Empty);
        }
        if !backends.contains_key(initial) {
            return Err(RegistryError::UnknownBackend(initial.to_string()));
        }
        Ok(Self {
            backends,
            current: RwLock::new(initial.to_string()),
        })
    }

    /// All configured backends with the current one flagged. Sorted by
    /// name, so the order is stable within a process.
    pub fn list(&self) -> Vec<BackendStatus> {
        let current = self.current_name();
        let mut names: Vec<&String> = self.backends.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| BackendStatus {
                name: name.clone(),
                is_current: *name == current,
            })
            .collect()
    }

    /// Make `name` the active backend and kick off a catalog refresh on it.
    ///
    /// The refresh runs fire-and-forget on the runtime; failures are
    /// logged, never propagated, and the selection stands either way.
    pub fn select(&self, name: &str) -> Result<(), RegistryError> {
        let Some(backend) = self.backends.get(name) else {
            return Err(RegistryError::UnknownBackend(name.to_string()));
        };

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = name.to_string();
        info!(backend = %name, "active execution backend changed");

        let backend = Arc::clone(backend);
        tokio::spawn(async move {
            if let Err(e) = backend.refresh_catalog().await {
                warn!(backend = %backend.name(), error = %e, "catalog refresh failed");
            }
        });
        Ok(())
    }

    /// Handle to a configured backend by name, current or not.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ExecutionBackend>> {
        self.backends.get(name).cloned()
    }

    /// Handle to the currently active backend.
    pub fn current(&self) -> Arc<dyn ExecutionBackend> {
        let name = self.current_name();
        // The name under the lock is always a configured key: `new`
        // validates the initial name and `select` rejects unknown ones.
        Arc::clone(&self.backends[&name])
    }

    pub fn current_name(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
