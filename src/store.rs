use std::error::Error;
use std::fmt;
use std::path::Path;

use rusqlite::Connection;

use crate::db::{self, UpsertVisit};
use crate::record::VisitRecord;

pub const LAST_DRIVE_SYNC_KEY: &str = "last_drive_sync";

/// Durable record store over SQLite. Every operation runs in its own
/// transaction and returns only after commit.
pub struct VisitStore {
    conn: Connection,
}

impl VisitStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        ensure_parent_dir(path)?;
        let conn = db::open_connection(path)?;
        tracing::debug!(path, "visit store opened");
        Ok(Self { conn })
    }

    /// Releases the connection. Dropping the store releases it too, but only
    /// this path reports a failed close.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, err)| StoreError::Db(err))
    }

    pub fn put(&mut self, record: &VisitRecord) -> Result<(), StoreError> {
        let record_json = serde_json::to_string(record)?;
        let tx = self.conn.transaction()?;
        db::upsert_visit(
            &tx,
            &UpsertVisit {
                id: &record.id,
                updated_at: &record.updated_at,
                record_json: &record_json,
            },
        )?;
        tx.commit()?;
        tracing::debug!(id = %record.id, "visit stored");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<VisitRecord>, StoreError> {
        match db::get_visit_json(&self.conn, id)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn get_all(&mut self) -> Result<Vec<VisitRecord>, StoreError> {
        let tx = self.conn.transaction()?;
        let rows = db::list_visit_json(&tx)?;
        tx.commit()?;
        rows.iter()
            .map(|text| serde_json::from_str(text).map_err(StoreError::from))
            .collect()
    }

    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        db::delete_visit(&tx, id)?;
        tx.commit()?;
        tracing::debug!(id, "visit deleted");
        Ok(())
    }

    pub fn set_meta(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        db::set_meta(&tx, key, value)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(db::get_meta(&self.conn, key)?)
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), StoreError> {
    if path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Corrupt(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
            StoreError::Db(err) => write!(f, "database error: {}", err),
            StoreError::Corrupt(err) => write!(f, "stored record is unreadable: {}", err),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Db(err) => Some(err),
            StoreError::Corrupt(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Corrupt(value)
    }
}
