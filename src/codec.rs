use std::error::Error;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::record::VisitRecord;

pub const BACKUP_FILE_NAME: &str = "VisitPlanner_Backup.json";

/// Snapshot uploaded by remote sync.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument<'a> {
    pub exported_at: &'a str,
    pub records: &'a [VisitRecord],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBackup {
    pub records: Vec<VisitRecord>,
    pub skipped: usize,
}

pub fn encode_records(records: &[VisitRecord]) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn encode_snapshot(records: &[VisitRecord], exported_at: &str) -> Result<String, CodecError> {
    let document = BackupDocument {
        exported_at,
        records,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parses a file export. The top level must be an array; elements without an
/// id are counted as skipped, everything else is taken without validation.
pub fn decode_records(text: &str) -> Result<DecodedBackup, CodecError> {
    let parsed: Value = serde_json::from_str(text)?;
    let Value::Array(items) = parsed else {
        return Err(CodecError::Format);
    };

    let mut decoded = DecodedBackup::default();
    for item in items {
        match VisitRecord::from_backup_value(item) {
            Some(record) => decoded.records.push(record),
            None => decoded.skipped += 1,
        }
    }
    Ok(decoded)
}

#[derive(Debug)]
pub enum CodecError {
    Json(serde_json::Error),
    Format,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Json(err) => write!(f, "JSON parse error: {}", err),
            CodecError::Format => write!(f, "Backup file format is invalid."),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CodecError::Json(err) => Some(err),
            CodecError::Format => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        CodecError::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{decode_records, encode_records, encode_snapshot, CodecError};
    use crate::record::VisitRecord;

    fn sample_records() -> Vec<VisitRecord> {
        let mut first = VisitRecord {
            id: "a".to_string(),
            customer_name: "Acme Corp".to_string(),
            location: "Dayton, OH".to_string(),
            issues: "Burrs on \"cutoff\" edge\nsecond shift".to_string(),
            updated_at: "2026-02-01T10:00:00.000Z".to_string(),
            ..VisitRecord::default()
        };
        first
            .extra
            .insert("photoCount".to_string(), Value::from(3));
        let second = VisitRecord {
            id: "b".to_string(),
            customer_name: "Ünïcode Papier".to_string(),
            updated_at: "2026-02-02T10:00:00.000Z".to_string(),
            ..VisitRecord::default()
        };
        vec![first, second]
    }

    #[test]
    fn decode_of_encode_returns_the_same_records() {
        let records = sample_records();
        let text = encode_records(&records).expect("encode should succeed");
        let decoded = decode_records(&text).expect("decode should succeed");
        assert_eq!(decoded.records, records);
        assert_eq!(decoded.skipped, 0);
    }

    #[test]
    fn encoding_is_pretty_and_deterministic() {
        let records = sample_records();
        let first = encode_records(&records).expect("encode should succeed");
        let second = encode_records(&records).expect("encode should succeed");
        assert_eq!(first, second);
        assert!(first.starts_with("[\n  {\n    \"id\": \"a\","));
        assert_eq!(encode_records(&[]).expect("encode should succeed"), "[]");
    }

    #[test]
    fn top_level_object_is_a_format_error() {
        let err = decode_records("{\"records\": []}").expect_err("object should be rejected");
        assert!(matches!(err, CodecError::Format));
        assert_eq!(err.to_string(), "Backup file format is invalid.");
    }

    #[test]
    fn invalid_json_is_a_json_error() {
        let err = decode_records("[{").expect_err("truncated input should fail");
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn elements_without_id_are_skipped() {
        let decoded = decode_records(r#"[{"id":"a"}, {"customerName":"no id"}, 5, null]"#)
            .expect("array should decode");
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].id, "a");
        assert_eq!(decoded.skipped, 3);
    }

    #[test]
    fn snapshot_wraps_records_with_export_time() {
        let records = sample_records();
        let text =
            encode_snapshot(&records, "2026-02-03T00:00:00.000Z").expect("encode should work");
        let value: Value = serde_json::from_str(&text).expect("snapshot should be JSON");
        assert_eq!(value["exportedAt"], "2026-02-03T00:00:00.000Z");
        assert_eq!(value["records"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["records"][0]["photoCount"], 3);
    }
}
