use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::api::ExtractionClient;
use crate::config::Config;
use crate::core::{
    ClientEvent,
    ExtractionBackend,
    FileStore,
    KeyValueStore,
    Result,
    UploadRequest,
    UploadTaskSettings,
};
use crate::sync::{TaskSynchronizer, TaskSynchronizerHandle};
use crate::tracking::{Ledger, SettingsStore};
use crate::uploader::UploadSubmitter;

const EVENT_CAPACITY: usize = 64;

/// Everything a front end needs, wired together once and passed around
pub struct AppContext {
    pub config: Config,
    pub client: ExtractionClient,
    pub backend: Arc<dyn ExtractionBackend>,
    pub ledger: Ledger,
    pub settings: SettingsStore,
    pub submitter: UploadSubmitter,
    event_tx: broadcast::Sender<ClientEvent>,
    sync_handle: TaskSynchronizerHandle,
}

impl AppContext {
    /// HTTP backend and file store from the config. Must run inside a tokio
    /// runtime, the synchronizer starts polling right away.
    pub fn start(config: Config) -> Result<Self> {
        let client = ExtractionClient::new(&config.endpoint, config.request_timeout())?;
        let store = FileStore::open(&config.storage_dir)?;
        tracing::debug!(storage_dir = %store.dir().display(), endpoint = %config.endpoint, "Context ready");

        let backend: Arc<dyn ExtractionBackend> = Arc::new(client.clone());
        Self::start_with(config, client, backend, Arc::new(store))
    }

    /// Same wiring around a caller supplied backend and store
    pub fn start_with(
        config: Config,
        client: ExtractionClient,
        backend: Arc<dyn ExtractionBackend>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let ledger = Ledger::new(store.clone());
        let settings = SettingsStore::new(store);
        let submitter = UploadSubmitter::new(backend.clone(), ledger.clone(), event_tx.clone());

        let sync_handle = TaskSynchronizer::spawn(
            backend.clone(),
            ledger.clone(),
            config.sync_config(),
            event_tx.clone(),
        );

        Ok(Self {
            config,
            client,
            backend,
            ledger,
            settings,
            submitter,
            event_tx,
            sync_handle,
        })
    }

    pub fn synchronizer(&self) -> &TaskSynchronizer {
        &self.sync_handle.synchronizer
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    /// Remember the settings for next time, then submit
    pub async fn upload(&self, path: impl AsRef<Path>, settings: &UploadTaskSettings) -> Result<UploadRequest> {
        if let Err(err) = self.settings.save(settings) {
            tracing::warn!(error = %err, "Failed to save upload settings");
        }

        self.submitter.submit(path, settings).await
    }

    pub async fn shutdown(self) -> Result<()> {
        self.sync_handle.shutdown().await
    }
}
