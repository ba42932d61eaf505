//! Remote module loading
//!
//! In-process model of loading an independently deployed application
//! bundle at runtime. Loading is an explicit asynchronous operation with a
//! result type and a timeout bound, replacing the original's implicit
//! loading boundary that had no failure path.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::host::AppId;

/// Handle to a successfully loaded remote module.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteModule {
    pub app: AppId,
    /// Entry-point identifier reported by the remote (e.g. `chatApp/App`).
    pub entry: String,
}

/// A loadable remote application bundle.
#[async_trait]
pub trait RemoteLoader: Send + Sync {
    async fn load(&self, app: AppId) -> Result<RemoteModule, LoadError>;
}

/// Loader that resolves immediately, for demos and tests.
pub struct StaticRemote {
    entry: String,
}

impl StaticRemote {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
        }
    }
}

#[async_trait]
impl RemoteLoader for StaticRemote {
    async fn load(&self, app: AppId) -> Result<RemoteModule, LoadError> {
        Ok(RemoteModule {
            app,
            entry: self.entry.clone(),
        })
    }
}

/// Registry mapping application ids to their remote loaders.
pub struct RemoteRegistry {
    loaders: Mutex<HashMap<AppId, Box<dyn RemoteLoader>>>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self {
            loaders: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, app: AppId, loader: Box<dyn RemoteLoader>) {
        self.loaders.lock().unwrap().insert(app, loader);
    }

    /// Load the remote module for `app`, bounded by `timeout`.
    pub async fn load(&self, app: AppId, timeout: Duration) -> Result<RemoteModule, LoadError> {
        // The loader is moved out for the duration of the load so the
        // registry lock is not held across the await.
        let loader = self
            .loaders
            .lock()
            .unwrap()
            .remove(&app)
            .ok_or(LoadError::NotRegistered(app))?;

        let result = tokio::time::timeout(timeout, loader.load(app)).await;
        self.loaders.lock().unwrap().insert(app, loader);

        match result {
            Ok(loaded) => loaded,
            Err(_) => Err(LoadError::Timeout {
                app,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

impl Default for RemoteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
