use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cache::RecordCache;
use crate::codec::{self, CodecError};
use crate::config::{ConfigError, DriveSettings};
use crate::record::{now_utc_rfc3339, VisitPatch, VisitRecord};
use crate::store::{StoreError, VisitStore, LAST_DRIVE_SYNC_KEY};
use crate::sync::{
    AuthSession, AuthState, BackupSync, Connectivity, DriveApi, SyncError, SyncStatus,
    TokenProvider,
};

/// Owns the store and its in-memory mirror. Every mutating action writes
/// the store first and touches the cache only after the write committed.
pub struct App {
    store: VisitStore,
    cache: RecordCache,
    drive: DriveSettings,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub source: String,
    pub imported: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub records: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub message: String,
    pub synced_at: Option<String>,
}

impl App {
    pub fn open(db_path: &str, drive: DriveSettings) -> Result<Self, AppError> {
        let mut store = VisitStore::open(db_path)?;
        let mut cache = RecordCache::new();
        cache.load(store.get_all()?);
        tracing::debug!(records = cache.len(), "record cache loaded");
        Ok(Self {
            store,
            cache,
            drive,
        })
    }

    pub fn close(self) -> Result<(), AppError> {
        Ok(self.store.close()?)
    }

    pub fn drive_settings(&self) -> &DriveSettings {
        &self.drive
    }

    pub fn create_visit(&mut self, patch: &VisitPatch) -> Result<VisitRecord, AppError> {
        let mut record = VisitRecord::blank();
        record.apply(patch);
        self.save(record)
    }

    pub fn update_visit(&mut self, id: &str, patch: &VisitPatch) -> Result<VisitRecord, AppError> {
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "edit requires at least one field flag".to_string(),
            ));
        }
        let mut record = self
            .store
            .get(id)?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        record.apply(patch);
        self.save(record)
    }

    /// Stamps `updatedAt` and persists the full record.
    pub fn save(&mut self, mut record: VisitRecord) -> Result<VisitRecord, AppError> {
        record.touch();
        self.store.put(&record)?;
        self.cache.upsert(record.clone());
        tracing::info!(id = %record.id, customer = record.display_name(), "visit saved");
        Ok(record)
    }

    /// Returns whether the visit existed. Deleting an unknown id is not an error.
    pub fn delete_visit(&mut self, id: &str) -> Result<bool, AppError> {
        let existed = self.cache.get(id).is_some();
        self.store.delete(id)?;
        self.cache.remove(id);
        tracing::info!(id, existed, "visit deleted");
        Ok(existed)
    }

    pub fn list_visits(&self, query: &str) -> Vec<VisitRecord> {
        self.cache.query(query)
    }

    pub fn visit_count(&self) -> usize {
        self.cache.len()
    }

    pub fn show_visit(&self, id: &str) -> Option<&VisitRecord> {
        self.cache.get(id)
    }

    pub fn export_backup(&mut self, out: &Path) -> Result<ExportSummary, AppError> {
        let records = self.store.get_all()?;
        let text = codec::encode_records(&records)?;
        if let Some(parent) = out.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(out, text)?;
        tracing::info!(path = %out.display(), records = records.len(), "backup exported");
        Ok(ExportSummary {
            path: out.to_path_buf(),
            records: records.len() as u64,
        })
    }

    /// Upserts every record with an id. The shape check happens before any
    /// write; after that each record commits on its own.
    pub fn import_backup(&mut self, file: &Path) -> Result<ImportSummary, AppError> {
        let text = std::fs::read_to_string(file)?;
        let decoded = codec::decode_records(&text)?;

        let mut imported = 0u64;
        for record in &decoded.records {
            self.store.put(record)?;
            imported += 1;
        }
        self.cache.load(self.store.get_all()?);

        tracing::info!(
            path = %file.display(),
            imported,
            skipped = decoded.skipped,
            "backup imported"
        );
        Ok(ImportSummary {
            source: file.display().to_string(),
            imported,
            skipped: decoded.skipped as u64,
        })
    }

    pub fn last_sync(&self) -> Result<Option<String>, AppError> {
        Ok(self.store.get_meta(LAST_DRIVE_SYNC_KEY)?)
    }

    /// Signs in and uploads a snapshot of the store. Offline short-circuits
    /// before the client id is checked or any prompt is shown.
    pub fn sync_drive<D: DriveApi>(
        &mut self,
        sync: &BackupSync<D>,
        provider: &mut dyn TokenProvider,
        connectivity: Connectivity,
    ) -> Result<SyncOutcome, AppError> {
        if connectivity == Connectivity::Offline {
            return Ok(SyncOutcome::from_status(SyncStatus::Offline, None));
        }

        let client_id = self.drive.client_id()?.to_string();
        let mut session = AuthSession::new(client_id);
        let status = session.initialize(&*provider);
        if status != SyncStatus::Ready {
            return Err(AppError::SignIn(status.to_string()));
        }
        let status = session.request_token(&mut *provider);
        if !matches!(session.state(), AuthState::Authenticated(_)) {
            return Err(AppError::SignIn(status.to_string()));
        }
        tracing::debug!("auth session ready");

        self.sync_with_session(sync, &mut session, connectivity)
    }

    pub fn sync_with_session<D: DriveApi>(
        &mut self,
        sync: &BackupSync<D>,
        session: &mut AuthSession,
        connectivity: Connectivity,
    ) -> Result<SyncOutcome, AppError> {
        let records = self.store.get_all()?;
        let payload = codec::encode_snapshot(&records, &now_utc_rfc3339())?;

        let status = sync.sync_backup(session, connectivity, &payload)?;
        let synced_at = match status {
            SyncStatus::Created | SyncStatus::Updated => {
                let now = now_utc_rfc3339();
                self.store.set_meta(LAST_DRIVE_SYNC_KEY, &now)?;
                Some(now)
            }
            _ => None,
        };
        Ok(SyncOutcome::from_status(status, synced_at))
    }
}

impl SyncOutcome {
    fn from_status(status: SyncStatus, synced_at: Option<String>) -> Self {
        Self {
            message: status.to_string(),
            status,
            synced_at,
        }
    }
}

pub fn default_export_path() -> PathBuf {
    PathBuf::from(codec::BACKUP_FILE_NAME)
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Store(StoreError),
    Codec(CodecError),
    Config(ConfigError),
    Sync(SyncError),
    SignIn(String),
    InvalidArgument(String),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Codec(err) => write!(f, "backup file error: {}", err),
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Sync(err) => write!(f, "Sync failed: {}", err),
            AppError::SignIn(message) => write!(f, "{}", message),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(id) => write!(f, "visit '{}' not found", id),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Codec(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Sync(err) => Some(err),
            AppError::SignIn(_) => None,
            AppError::InvalidArgument(_) => None,
            AppError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<CodecError> for AppError {
    fn from(value: CodecError) -> Self {
        AppError::Codec(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<SyncError> for AppError {
    fn from(value: SyncError) -> Self {
        AppError::Sync(value)
    }
}

#[cfg(test)]
mod tests;
