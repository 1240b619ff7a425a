use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{App, AppError};
use crate::config::{ConfigError, ConfigFile, DriveSettings};
use crate::record::{VisitPatch, VisitRecord};
use crate::store::{VisitStore, LAST_DRIVE_SYNC_KEY};
use crate::sync::{
    AccessToken, AuthSession, AuthState, BackupSync, Connectivity, DriveApi, DriveFile,
    MultipartBody, RemoteOperation, StaticTokenProvider, SyncError, SyncStatus, TokenProvider,
    TokenRequest,
};

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("visit-planner-app-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("temp workspace should be creatable");
    root
}

fn db_path(root: &Path) -> String {
    root.join(".visit-planner/state.sqlite")
        .to_str()
        .expect("utf8 path")
        .to_string()
}

fn settings(client_id: Option<&str>) -> DriveSettings {
    DriveSettings::resolve(ConfigFile::default(), client_id.map(str::to_string))
}

fn open_app(root: &Path) -> App {
    App::open(&db_path(root), settings(Some("client-1"))).expect("app should open")
}

fn named(customer: &str, location: &str) -> VisitPatch {
    VisitPatch {
        customer_name: Some(customer.to_string()),
        location: Some(location.to_string()),
        ..VisitPatch::default()
    }
}

#[derive(Default)]
struct RecordingDrive {
    uploads: RefCell<Vec<String>>,
    searches: RefCell<usize>,
    fail_search: Option<u16>,
}

impl DriveApi for RecordingDrive {
    fn search(
        &self,
        _token: &AccessToken,
        operation: RemoteOperation,
        _query: &str,
        _fields: &str,
    ) -> Result<Vec<DriveFile>, SyncError> {
        *self.searches.borrow_mut() += 1;
        if let Some(status) = self.fail_search {
            return Err(SyncError::RemoteApi { operation, status });
        }
        Ok(Vec::new())
    }

    fn create_folder(&self, _token: &AccessToken, _name: &str) -> Result<DriveFile, SyncError> {
        Ok(DriveFile {
            id: "folder-1".to_string(),
            name: None,
            modified_time: None,
        })
    }

    fn create_file(
        &self,
        _token: &AccessToken,
        body: &MultipartBody,
    ) -> Result<DriveFile, SyncError> {
        self.uploads.borrow_mut().push(body.as_str().to_string());
        Ok(DriveFile {
            id: "file-1".to_string(),
            name: None,
            modified_time: None,
        })
    }

    fn update_file(
        &self,
        _token: &AccessToken,
        file_id: &str,
        body: &MultipartBody,
    ) -> Result<DriveFile, SyncError> {
        self.uploads.borrow_mut().push(body.as_str().to_string());
        Ok(DriveFile {
            id: file_id.to_string(),
            name: None,
            modified_time: None,
        })
    }
}

fn backup_sync(drive: RecordingDrive) -> BackupSync<RecordingDrive> {
    BackupSync::new(drive, "VisitPlanner Backups", "VisitPlanner_Backup.json")
}

#[test]
fn create_visit_persists_and_mirrors_into_cache() {
    let root = unique_workspace();
    let mut app = open_app(&root);

    let created = app
        .create_visit(&named("  Acme Corp ", "Dayton, OH"))
        .expect("create should succeed");
    assert_eq!(created.customer_name, "Acme Corp");
    assert!(!created.id.is_empty());
    assert!(!created.updated_at.is_empty());
    assert!(!created.date.is_empty());
    assert_eq!(app.visit_count(), 1);
    app.close().expect("close should succeed");

    let reopened = open_app(&root);
    let shown = reopened
        .show_visit(&created.id)
        .expect("visit should survive a reopen");
    assert_eq!(shown, &created);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn update_visit_overlays_patch_and_restamps() {
    let root = unique_workspace();
    let mut app = open_app(&root);

    let mut stale = app
        .create_visit(&named("Acme", "Dayton"))
        .expect("create should succeed");
    stale.updated_at = "2000-01-01T00:00:00.000Z".to_string();
    let created = app.save(stale).expect("save should succeed");
    assert_ne!(created.updated_at, "2000-01-01T00:00:00.000Z");

    let updated = app
        .update_visit(
            &created.id,
            &VisitPatch {
                goal: Some(" Trial new knives ".to_string()),
                ..VisitPatch::default()
            },
        )
        .expect("update should succeed");
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.customer_name, "Acme");
    assert_eq!(updated.goal, "Trial new knives");
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(app.visit_count(), 1);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn update_visit_rejects_unknown_id_and_empty_patch() {
    let root = unique_workspace();
    let mut app = open_app(&root);

    let missing = app
        .update_visit("nope", &named("Acme", "Dayton"))
        .expect_err("unknown id should fail");
    assert!(matches!(missing, AppError::NotFound(ref id) if id == "nope"));

    let created = app
        .create_visit(&named("Acme", "Dayton"))
        .expect("create should succeed");
    let empty = app
        .update_visit(&created.id, &VisitPatch::default())
        .expect_err("empty patch should fail");
    assert!(matches!(empty, AppError::InvalidArgument(_)));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn delete_visit_removes_from_store_and_cache() {
    let root = unique_workspace();
    let mut app = open_app(&root);

    let created = app
        .create_visit(&named("Acme", "Dayton"))
        .expect("create should succeed");
    assert!(app.delete_visit(&created.id).expect("delete should succeed"));
    assert!(app.show_visit(&created.id).is_none());
    assert!(!app.delete_visit(&created.id).expect("second delete is a no-op"));
    app.close().expect("close should succeed");

    let reopened = open_app(&root);
    assert_eq!(reopened.visit_count(), 0);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn list_visits_filters_on_name_and_location() {
    let root = unique_workspace();
    let mut app = open_app(&root);

    app.create_visit(&named("Acme Corp", "Dayton"))
        .expect("create should succeed");
    app.create_visit(&named("Globex", "Springfield"))
        .expect("create should succeed");

    assert_eq!(app.list_visits("").len(), 2);
    let hits = app.list_visits("  SPRING ");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].customer_name, "Globex");
    assert!(app.list_visits("initech").is_empty());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn export_then_import_into_fresh_store_reproduces_records() {
    let source_root = unique_workspace();
    let mut source = open_app(&source_root);
    source
        .create_visit(&named("Acme", "Dayton"))
        .expect("create should succeed");
    source
        .create_visit(&named("Globex", "Springfield"))
        .expect("create should succeed");

    let out = source_root.join("exports/VisitPlanner_Backup.json");
    let exported = source.export_backup(&out).expect("export should succeed");
    assert_eq!(exported.records, 2);

    let target_root = unique_workspace();
    let mut target = open_app(&target_root);
    let summary = target.import_backup(&out).expect("import should succeed");
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 0);

    let mut expected = source.list_visits("");
    let mut actual = target.list_visits("");
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    actual.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(actual, expected);
    let after_first = target.store.get_all().expect("get_all should succeed");
    let listed_first = target.list_visits("");

    let again = target.import_backup(&out).expect("re-import should succeed");
    assert_eq!(again.imported, 2);
    assert_eq!(target.visit_count(), 2);
    assert_eq!(
        target.store.get_all().expect("get_all should succeed"),
        after_first
    );
    assert_eq!(target.list_visits(""), listed_first);

    let _ = std::fs::remove_dir_all(source_root);
    let _ = std::fs::remove_dir_all(target_root);
}

#[test]
fn import_skips_elements_without_id_and_keeps_the_rest_verbatim() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    let file = root.join("backup.json");
    std::fs::write(
        &file,
        r#"[{"id":"a","customerName":"Acme","legacyField":7},{"customerName":"No id"},5]"#,
    )
    .expect("fixture should be writable");

    let summary = app.import_backup(&file).expect("import should succeed");
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 2);

    let record = app.show_visit("a").expect("record a should exist");
    assert_eq!(record.customer_name, "Acme");
    assert_eq!(
        record.extra.get("legacyField"),
        Some(&serde_json::json!(7))
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn imported_non_string_values_export_unchanged() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    let file = root.join("odd.json");
    std::fs::write(
        &file,
        r#"[{"id":7,"customerName":42,"location":null,"issues":["burrs"]},{"id":0},{"id":true}]"#,
    )
    .expect("fixture should be writable");

    let summary = app.import_backup(&file).expect("import should succeed");
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        app.show_visit("7").map(|r| r.customer_name.as_str()),
        Some("42")
    );

    let out = root.join("export.json");
    app.export_backup(&out).expect("export should succeed");
    let text = std::fs::read_to_string(&out).expect("export should be readable");
    let exported: serde_json::Value = serde_json::from_str(&text).expect("export is JSON");
    let records = exported.as_array().expect("export is an array");
    let numeric = records
        .iter()
        .find(|r| r["id"] == serde_json::json!(7))
        .expect("numeric id should export as a number");
    assert_eq!(numeric["customerName"], serde_json::json!(42));
    assert_eq!(numeric["location"], serde_json::Value::Null);
    assert_eq!(numeric["issues"], serde_json::json!(["burrs"]));
    assert!(records.iter().any(|r| r["id"] == serde_json::json!(true)));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn import_of_non_array_fails_and_leaves_store_unchanged() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    app.create_visit(&named("Acme", "Dayton"))
        .expect("create should succeed");

    let file = root.join("object.json");
    std::fs::write(&file, r#"{"id":"x"}"#).expect("fixture should be writable");
    let err = app
        .import_backup(&file)
        .expect_err("object top level should fail");
    assert!(err.to_string().contains("Backup file format is invalid."));
    assert_eq!(app.visit_count(), 1);

    let mut store = VisitStore::open(&db_path(&root)).expect("store should open");
    assert_eq!(store.get_all().expect("get_all should succeed").len(), 1);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn offline_sync_is_a_status_and_skips_config_and_network() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root), settings(None)).expect("app should open");
    let sync = backup_sync(RecordingDrive::default());
    let mut provider = StaticTokenProvider::new(None);

    let outcome = app
        .sync_drive(&sync, &mut provider, Connectivity::Offline)
        .expect("offline should not be an error");
    assert_eq!(outcome.status, SyncStatus::Offline);
    assert_eq!(outcome.synced_at, None);
    assert_eq!(*sync.drive().searches.borrow(), 0);
    assert_eq!(app.last_sync().expect("meta read"), None);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn sync_without_client_id_is_a_config_error() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root), settings(None)).expect("app should open");
    let sync = backup_sync(RecordingDrive::default());
    let mut provider = StaticTokenProvider::new(Some("tok".to_string()));

    let err = app
        .sync_drive(&sync, &mut provider, Connectivity::Online)
        .expect_err("missing client id should fail");
    assert!(matches!(err, AppError::Config(ConfigError::MissingClientId)));
    assert_eq!(*sync.drive().searches.borrow(), 0);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn sync_without_token_reports_sign_in_failure() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    let sync = backup_sync(RecordingDrive::default());
    let mut provider = StaticTokenProvider::new(None);

    let err = app
        .sync_drive(&sync, &mut provider, Connectivity::Online)
        .expect_err("no token should fail");
    assert!(matches!(err, AppError::SignIn(_)));
    assert_eq!(*sync.drive().searches.borrow(), 0);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn sign_in_prompt_unavailable_is_reported_as_not_ready() {
    struct Unavailable;
    impl TokenProvider for Unavailable {
        fn readiness(&self) -> Result<(), String> {
            Err("Google sign-in is unavailable.".to_string())
        }
        fn request_token(&mut self, _request: &TokenRequest<'_>) -> io::Result<Option<String>> {
            Ok(Some("never".to_string()))
        }
    }

    let root = unique_workspace();
    let mut app = open_app(&root);
    let sync = backup_sync(RecordingDrive::default());

    let err = app
        .sync_drive(&sync, &mut Unavailable, Connectivity::Online)
        .expect_err("unavailable provider should fail");
    assert_eq!(err.to_string(), "Google sign-in is unavailable.");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn successful_sync_uploads_snapshot_and_records_timestamp() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    let created = app
        .create_visit(&named("Acme", "Dayton"))
        .expect("create should succeed");
    let sync = backup_sync(RecordingDrive::default());
    let mut provider = StaticTokenProvider::new(Some("tok".to_string()));

    let outcome = app
        .sync_drive(&sync, &mut provider, Connectivity::Online)
        .expect("sync should succeed");
    assert_eq!(outcome.status, SyncStatus::Created);
    assert_eq!(outcome.message, "Drive backup created.");
    let synced_at = outcome.synced_at.expect("timestamp should be set");
    assert_eq!(app.last_sync().expect("meta read"), Some(synced_at));

    let uploads = sync.drive().uploads.borrow();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].contains("\"exportedAt\""));
    assert!(uploads[0].contains(&created.id));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn signed_in_session_can_be_reused_for_sync() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    let sync = backup_sync(RecordingDrive::default());
    let mut provider = StaticTokenProvider::new(Some("tok".to_string()));
    let mut session = AuthSession::new("client-1");

    assert_eq!(session.state(), &AuthState::Unauthenticated);
    session.initialize(&provider);
    assert_eq!(session.request_token(&mut provider), SyncStatus::SignedIn);
    assert!(matches!(session.state(), AuthState::Authenticated(_)));

    let outcome = app
        .sync_with_session(&sync, &mut session, Connectivity::Online)
        .expect("sync should succeed");
    assert_eq!(outcome.status, SyncStatus::Created);
    assert_eq!(session.last_status(), Some(&SyncStatus::Created));
    assert!(matches!(session.state(), AuthState::Authenticated(_)));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn failed_sync_leaves_last_sync_untouched() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    let sync = backup_sync(RecordingDrive {
        fail_search: Some(401),
        ..RecordingDrive::default()
    });
    let mut provider = StaticTokenProvider::new(Some("tok".to_string()));

    let err = app
        .sync_drive(&sync, &mut provider, Connectivity::Online)
        .expect_err("401 should fail");
    assert_eq!(
        err.to_string(),
        "Sync failed: Drive folder search failed (401)."
    );
    assert_eq!(app.last_sync().expect("meta read"), None);

    let mut store = VisitStore::open(&db_path(&root)).expect("store should open");
    assert_eq!(
        store.get_meta(LAST_DRIVE_SYNC_KEY).expect("meta read"),
        None
    );
    assert!(store.get_all().expect("get_all").is_empty());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn save_keeps_unknown_fields_from_imported_records() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    let mut record = VisitRecord {
        id: "legacy".to_string(),
        ..VisitRecord::default()
    };
    record
        .extra
        .insert("oldNotes".to_string(), serde_json::json!("keep me"));

    let saved = app.save(record).expect("save should succeed");
    assert_eq!(
        saved.extra.get("oldNotes"),
        Some(&serde_json::json!("keep me"))
    );
    assert_eq!(
        app.show_visit("legacy").and_then(|r| r.extra.get("oldNotes")),
        Some(&serde_json::json!("keep me"))
    );

    let _ = std::fs::remove_dir_all(root);
}
