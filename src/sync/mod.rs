use std::error::Error;
use std::fmt;

use serde::Serialize;

mod connectivity;
mod drive;
mod multipart;
mod session;

use drive::{file_query, folder_query};
use multipart::random_boundary;

pub use connectivity::Connectivity;
pub use drive::{DriveFile, HttpDriveApi};
pub use multipart::MultipartBody;
pub use session::{
    AccessToken, AuthSession, AuthState, PromptTokenProvider, StaticTokenProvider,
    TokenProvider, TokenRequest,
};

pub const BACKUP_FOLDER_NAME: &str = "VisitPlanner Backups";

/// Outcome of one auth or sync step, readable as status text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SyncStatus {
    NotReady(String),
    Ready,
    SignedIn,
    Syncing,
    Created,
    Updated,
    Offline,
    Failed(String),
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::NotReady(reason) => write!(f, "{}", reason),
            SyncStatus::Ready => write!(f, "Ready. Sign in to Google to authorize Drive backups."),
            SyncStatus::SignedIn => write!(f, "Signed in. Ready to sync."),
            SyncStatus::Syncing => write!(f, "Syncing to Drive..."),
            SyncStatus::Created => write!(f, "Drive backup created."),
            SyncStatus::Updated => write!(f, "Drive backup updated."),
            SyncStatus::Offline => {
                write!(f, "Offline. Sync will work when internet is available.")
            }
            SyncStatus::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

/// Remote calls made by the backup protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    FolderSearch,
    FolderCreate,
    FileSearch,
    FileCreate,
    FileUpdate,
}

impl RemoteOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteOperation::FolderSearch => "Drive folder search",
            RemoteOperation::FolderCreate => "Drive folder create",
            RemoteOperation::FileSearch => "Drive file search",
            RemoteOperation::FileCreate => "Drive upload (create)",
            RemoteOperation::FileUpdate => "Drive upload (update)",
        }
    }
}

/// The remote drive surface the backup protocol needs.
pub trait DriveApi {
    fn search(
        &self,
        token: &AccessToken,
        operation: RemoteOperation,
        query: &str,
        fields: &str,
    ) -> Result<Vec<DriveFile>, SyncError>;

    fn create_folder(&self, token: &AccessToken, name: &str) -> Result<DriveFile, SyncError>;

    fn create_file(
        &self,
        token: &AccessToken,
        body: &MultipartBody,
    ) -> Result<DriveFile, SyncError>;

    fn update_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        body: &MultipartBody,
    ) -> Result<DriveFile, SyncError>;
}

/// Uploads the backup document, replacing the previous copy in place.
/// Every run looks the folder and file up again; nothing is cached.
pub struct BackupSync<D> {
    drive: D,
    folder_name: String,
    file_name: String,
}

impl<D: DriveApi> BackupSync<D> {
    pub fn new(drive: D, folder_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            drive,
            folder_name: folder_name.into(),
            file_name: file_name.into(),
        }
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn sync_backup(
        &self,
        session: &mut AuthSession,
        connectivity: Connectivity,
        json_text: &str,
    ) -> Result<SyncStatus, SyncError> {
        if connectivity == Connectivity::Offline {
            tracing::info!("offline, skipping drive sync");
            return Ok(session.report(SyncStatus::Offline));
        }

        let token = match session.token() {
            Some(token) => token.clone(),
            None => {
                let err = SyncError::AuthRequired;
                session.report(SyncStatus::Failed(err.to_string()));
                return Err(err);
            }
        };

        session.report(SyncStatus::Syncing);
        match self.upload(&token, json_text) {
            Ok(status) => Ok(session.report(status)),
            Err(err) => {
                tracing::warn!(error = %err, "drive sync failed");
                session.report(SyncStatus::Failed(format!("Sync failed: {}", err)));
                Err(err)
            }
        }
    }

    fn upload(&self, token: &AccessToken, json_text: &str) -> Result<SyncStatus, SyncError> {
        let folder_id = self.find_or_create_folder(token)?;
        match self.find_backup_file(token, &folder_id)? {
            Some(file_id) => {
                let body = MultipartBody::new(
                    &serde_json::json!({ "name": self.file_name }),
                    json_text,
                    random_boundary(),
                );
                self.drive.update_file(token, &file_id, &body)?;
                tracing::info!(file_id = %file_id, "drive backup updated");
                Ok(SyncStatus::Updated)
            }
            None => {
                let body = MultipartBody::new(
                    &serde_json::json!({ "name": self.file_name, "parents": [folder_id] }),
                    json_text,
                    random_boundary(),
                );
                let created = self.drive.create_file(token, &body)?;
                tracing::info!(file_id = %created.id, "drive backup created");
                Ok(SyncStatus::Created)
            }
        }
    }

    fn find_or_create_folder(&self, token: &AccessToken) -> Result<String, SyncError> {
        let found = self.drive.search(
            token,
            RemoteOperation::FolderSearch,
            &folder_query(&self.folder_name),
            "files(id,name)",
        )?;
        if let Some(folder) = found.into_iter().next() {
            return Ok(folder.id);
        }

        let created = self.drive.create_folder(token, &self.folder_name)?;
        tracing::debug!(folder_id = %created.id, "drive backup folder created");
        Ok(created.id)
    }

    fn find_backup_file(
        &self,
        token: &AccessToken,
        folder_id: &str,
    ) -> Result<Option<String>, SyncError> {
        let found = self.drive.search(
            token,
            RemoteOperation::FileSearch,
            &file_query(&self.file_name, folder_id),
            "files(id,name,modifiedTime)",
        )?;
        let existing = found.into_iter().next();
        if let Some(file) = &existing {
            tracing::debug!(
                file_id = %file.id,
                name = ?file.name,
                modified = ?file.modified_time,
                "existing drive backup found"
            );
        }
        Ok(existing.map(|file| file.id))
    }
}

#[derive(Debug)]
pub enum SyncError {
    AuthRequired,
    RemoteApi {
        operation: RemoteOperation,
        status: u16,
    },
    Http(reqwest::Error),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::AuthRequired => {
                write!(f, "Not signed in. Sign in to Google first.")
            }
            SyncError::RemoteApi { operation, status } => {
                write!(f, "{} failed ({}).", operation.as_str(), status)
            }
            SyncError::Http(err) => write!(f, "HTTP error: {}", err),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncError::AuthRequired => None,
            SyncError::RemoteApi { .. } => None,
            SyncError::Http(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(value: reqwest::Error) -> Self {
        SyncError::Http(value)
    }
}
