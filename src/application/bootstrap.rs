use crate::application::session::StudySession;
use crate::domain::calendar::StudyClock;
use crate::infrastructure::config::{ensure_default_config, load_config, AppConfig, StoreKind};
use crate::infrastructure::document_store::{InMemoryDocumentStore, StudyDocumentStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::logging::{init_logging, LoggingGuard};
use crate::infrastructure::rest_store::RestDocumentStore;
use crate::infrastructure::sqlite_store::{initialize_database, SqliteDocumentStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
    pub config: AppConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("focusflow.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_config(&config_dir)?;
    let config = load_config(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        database_path,
        config,
    })
}

impl BootstrapResult {
    pub fn document_store(&self) -> Result<Arc<dyn StudyDocumentStore>, InfraError> {
        let store: Arc<dyn StudyDocumentStore> = match self.config.store.kind {
            StoreKind::Sqlite => Arc::new(SqliteDocumentStore::new(&self.database_path)),
            StoreKind::Memory => Arc::new(InMemoryDocumentStore::default()),
            StoreKind::Rest => {
                let base_url = self.config.store.base_url.as_deref().ok_or_else(|| {
                    InfraError::InvalidConfig("store.baseUrl is required for the rest store".to_string())
                })?;
                Arc::new(RestDocumentStore::new(base_url)?)
            }
        };
        Ok(store)
    }

    /// Installs the global subscriber writing to `logs/` at the configured level.
    pub fn init_logging(&self) -> Result<LoggingGuard, InfraError> {
        init_logging(&self.config.log_level, &self.logs_dir)
    }

    pub fn clock(&self) -> Result<StudyClock, InfraError> {
        Ok(StudyClock::new(self.config.resolved_timezone()?))
    }

    pub fn open_session(&self) -> Result<StudySession, InfraError> {
        tracing::info!(
            workspace = %self.workspace_root.display(),
            store = ?self.config.store.kind,
            "opening study session"
        );
        Ok(StudySession::new(self.document_store()?, self.clock()?))
    }
}
