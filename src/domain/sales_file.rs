use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SalesFileId = Uuid;

/// Provenance record for a batch of sales loaded from a CSV file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesFile {
    pub id: SalesFileId,
    pub file_name: String,
    pub row_count: i64,
    pub imported_at: DateTime<Utc>,
}

impl SalesFile {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            row_count: 0,
            imported_at: Utc::now(),
        }
    }
}
