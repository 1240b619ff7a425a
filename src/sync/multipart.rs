use serde_json::Value;
use uuid::Uuid;

const PART_CONTENT_TYPE: &str = "Content-Type: application/json; charset=UTF-8";

/// A `multipart/related` upload body: JSON metadata part, then the content part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    body: String,
}

impl MultipartBody {
    pub fn new(metadata: &Value, content: &str, boundary: impl Into<String>) -> Self {
        let boundary = boundary.into();
        let delimiter = format!("--{boundary}");
        let close_delimiter = format!("--{boundary}--");
        let metadata = metadata.to_string();

        let body = [
            delimiter.as_str(),
            PART_CONTENT_TYPE,
            "",
            metadata.as_str(),
            delimiter.as_str(),
            PART_CONTENT_TYPE,
            "",
            content,
            close_delimiter.as_str(),
            "",
        ]
        .join("\r\n");

        Self { boundary, body }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.body.as_bytes().to_vec()
    }
}

pub fn random_boundary() -> String {
    format!("----VisitPlannerBoundary{}", Uuid::new_v4().simple())
}
