#![forbid(unsafe_code)]

use crate::config::{Backend, ServerConfig};
use crate::error::{ApiError, StartupError};
use qc_storage::{
    AttachmentKind, AttachmentRegistry, ChecklistBook, JsonFileStore, RecordStore, SqliteStore,
    TransformerRegistry, UploadSink, UserDirectory,
};
use std::sync::Arc;

/// Storage engines shared by every request. All of them are synchronous and
/// run on the blocking pool.
pub struct Services {
    pub users: UserDirectory,
    pub transformers: TransformerRegistry,
    pub boms: AttachmentRegistry,
    pub documents: AttachmentRegistry,
    pub checklists: ChecklistBook,
    pub uploads: UploadSink,
}

impl Services {
    pub fn attachments(&self, kind: AttachmentKind) -> &AttachmentRegistry {
        match kind {
            AttachmentKind::Bom => &self.boms,
            AttachmentKind::Document => &self.documents,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    services: Arc<Services>,
    max_upload_bytes: u64,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, uploads: UploadSink) -> Self {
        let max_upload_bytes = uploads.max_bytes();
        let services = Services {
            users: UserDirectory::new(Arc::clone(&store)),
            transformers: TransformerRegistry::new(Arc::clone(&store)),
            boms: AttachmentRegistry::new(Arc::clone(&store), AttachmentKind::Bom),
            documents: AttachmentRegistry::new(Arc::clone(&store), AttachmentKind::Document),
            checklists: ChecklistBook::new(store),
            uploads,
        };
        Self {
            services: Arc::new(services),
            max_upload_bytes,
        }
    }

    /// Opens the configured backend and upload directory and seeds the
    /// default accounts into an empty users collection.
    pub fn open(config: &ServerConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn RecordStore> = match config.backend {
            Backend::Json => Arc::new(JsonFileStore::open(&config.data_dir)?),
            Backend::Sqlite => Arc::new(SqliteStore::open(&config.data_dir)?),
        };
        let uploads = UploadSink::open(&config.upload_dir, config.max_upload_bytes)?;
        let state = Self::new(store, uploads);
        state.services.users.seed_defaults()?;
        tracing::info!(
            backend = ?config.backend,
            data_dir = %config.data_dir.display(),
            upload_dir = %config.upload_dir.display(),
            "storage ready"
        );
        Ok(state)
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Runs `work` on the blocking pool.
    pub(crate) async fn blocking<R, F>(&self, work: F) -> Result<R, ApiError>
    where
        F: FnOnce(&Services) -> R + Send + 'static,
        R: Send + 'static,
    {
        let services = Arc::clone(&self.services);
        Ok(tokio::task::spawn_blocking(move || work(&services)).await?)
    }
}
