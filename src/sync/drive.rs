use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::{AccessToken, DriveApi, MultipartBody, RemoteOperation, SyncError};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

pub fn folder_query(folder_name: &str) -> String {
    format!(
        "mimeType='{FOLDER_MIME_TYPE}' and name='{}' and trashed=false",
        quote_literal(folder_name)
    )
}

pub fn file_query(file_name: &str, folder_id: &str) -> String {
    format!(
        "name='{}' and '{}' in parents and trashed=false",
        quote_literal(file_name),
        quote_literal(folder_id)
    )
}

/// Escapes a value for a single-quoted literal in a Drive `q` string.
fn quote_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive v3 over blocking HTTP. No retries; timeouts are the client defaults.
#[derive(Debug, Clone)]
pub struct HttpDriveApi {
    client: Client,
    api_base_url: String,
    upload_base_url: String,
}

impl HttpDriveApi {
    pub fn new(api_base_url: &str, upload_base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: upload_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.api_base_url)
    }

    fn upload_url(&self, file_id: Option<&str>) -> String {
        match file_id {
            Some(id) => format!("{}/files/{}?uploadType=multipart", self.upload_base_url, id),
            None => format!("{}/files?uploadType=multipart", self.upload_base_url),
        }
    }

    fn request(&self, method: Method, url: &str, token: &AccessToken) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
    }

    fn upload(
        &self,
        method: Method,
        url: &str,
        token: &AccessToken,
        body: &MultipartBody,
        operation: RemoteOperation,
    ) -> Result<DriveFile, SyncError> {
        tracing::debug!(
            operation = operation.as_str(),
            boundary = body.boundary(),
            bytes = body.as_str().len(),
            "drive upload"
        );
        let resp = self
            .request(method, url, token)
            .header(CONTENT_TYPE, body.content_type())
            .body(body.to_bytes())
            .send()?;
        Ok(ensure_success(resp, operation)?.json()?)
    }
}

impl DriveApi for HttpDriveApi {
    fn search(
        &self,
        token: &AccessToken,
        operation: RemoteOperation,
        query: &str,
        fields: &str,
    ) -> Result<Vec<DriveFile>, SyncError> {
        tracing::debug!(operation = operation.as_str(), query, "drive search");
        let resp = self
            .request(Method::GET, &self.files_url(), token)
            .query(&[("q", query), ("fields", fields)])
            .send()?;
        let list: FileList = ensure_success(resp, operation)?.json()?;
        Ok(list.files)
    }

    fn create_folder(&self, token: &AccessToken, name: &str) -> Result<DriveFile, SyncError> {
        let resp = self
            .request(Method::POST, &self.files_url(), token)
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }))
            .send()?;
        Ok(ensure_success(resp, RemoteOperation::FolderCreate)?.json()?)
    }

    fn create_file(
        &self,
        token: &AccessToken,
        body: &MultipartBody,
    ) -> Result<DriveFile, SyncError> {
        self.upload(
            Method::POST,
            &self.upload_url(None),
            token,
            body,
            RemoteOperation::FileCreate,
        )
    }

    fn update_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        body: &MultipartBody,
    ) -> Result<DriveFile, SyncError> {
        self.upload(
            Method::PATCH,
            &self.upload_url(Some(file_id)),
            token,
            body,
            RemoteOperation::FileUpdate,
        )
    }
}

fn ensure_success(resp: Response, operation: RemoteOperation) -> Result<Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(SyncError::RemoteApi {
            operation,
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{file_query, folder_query, HttpDriveApi};

    #[test]
    fn folder_query_matches_drive_search_syntax() {
        assert_eq!(
            folder_query("VisitPlanner Backups"),
            "mimeType='application/vnd.google-apps.folder' and name='VisitPlanner Backups' and trashed=false"
        );
    }

    #[test]
    fn file_query_scopes_search_to_folder() {
        assert_eq!(
            file_query("VisitPlanner_Backup.json", "folder-9"),
            "name='VisitPlanner_Backup.json' and 'folder-9' in parents and trashed=false"
        );
    }

    #[test]
    fn query_literals_escape_quotes_and_backslashes() {
        assert_eq!(
            folder_query("Bob's Backups"),
            "mimeType='application/vnd.google-apps.folder' and name='Bob\\'s Backups' and trashed=false"
        );
        assert_eq!(
            file_query("a\\b's.json", "folder-9"),
            "name='a\\\\b\\'s.json' and 'folder-9' in parents and trashed=false"
        );
    }

    #[test]
    fn upload_urls_select_multipart_and_target_file() {
        let api = HttpDriveApi::new(
            "https://www.googleapis.com/drive/v3/",
            "https://www.googleapis.com/upload/drive/v3",
        );
        assert_eq!(api.files_url(), "https://www.googleapis.com/drive/v3/files");
        assert_eq!(
            api.upload_url(None),
            "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart"
        );
        assert_eq!(
            api.upload_url(Some("f1")),
            "https://www.googleapis.com/upload/drive/v3/files/f1?uploadType=multipart"
        );
    }
}
