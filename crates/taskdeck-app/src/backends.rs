/*
[INPUT]:  Application configuration or an in-memory backend
[OUTPUT]: Shared trait objects for auth, task rows, storage and the live feed
[POS]:    Wiring layer - builds the backend clients the gate and controller use
[UPDATE]: When a new backend capability is wired in
*/

use std::sync::Arc;

use anyhow::Context;
use taskdeck_adapter::{
    AuthClient, AuthProvider, BackendClient, ChangeFeed, MemoryBackend, ObjectStorage, RealtimeClient,
    SessionStore, StorageClient, TaskStore, TaskTable,
};
use tracing::info;

use crate::config::AppConfig;

/// Backend handles shared by the gate and the task controller
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn TaskStore>,
    pub storage: Arc<dyn ObjectStorage>,
    /// `None` disables the live channel
    pub feed: Option<Arc<dyn ChangeFeed>>,
}

impl Backends {
    /// Clients for the hosted backend described by `config`
    pub fn hosted(config: &AppConfig) -> anyhow::Result<Self> {
        let client = BackendClient::with_config(
            &config.backend.url,
            config.backend.api_key.clone(),
            config.client_config(),
        )
        .context("create backend client")?;

        let auth = match config.session_path() {
            Some(path) => {
                info!(path = %path.display(), "session persistence enabled");
                AuthClient::with_store(client.clone(), SessionStore::new(path))
            }
            None => AuthClient::new(client.clone()),
        };

        let feed: Option<Arc<dyn ChangeFeed>> = if config.tasks.realtime {
            Some(Arc::new(RealtimeClient::with_config(
                client.clone(),
                config.realtime_config(),
            )))
        } else {
            None
        };

        Ok(Self {
            auth: Arc::new(auth),
            store: Arc::new(TaskTable::new(client.clone(), config.tasks.table.clone())),
            storage: Arc::new(StorageClient::new(client)),
            feed,
        })
    }

    /// Every capability served by one in-memory backend
    pub fn memory(backend: MemoryBackend) -> Self {
        let shared = Arc::new(backend);
        Self {
            auth: shared.clone(),
            store: shared.clone(),
            storage: shared.clone(),
            feed: Some(shared),
        }
    }

    /// Same backends without a live channel
    pub fn without_feed(mut self) -> Self {
        self.feed = None;
        self
    }
}
