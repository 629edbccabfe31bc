use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::types::Collection;

pub const EXPORT_VERSION: &str = "1.0";

/// Portable backup of a collection, as written by `export` and read by `import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionExport {
    pub collection: Collection,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl CollectionExport {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            export_date: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export document. Only the `collection` member is required;
    /// a missing date or version is filled in, a different major version is
    /// refused.
    pub fn parse(data: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| SyncError::InvalidExport(format!("not JSON: {}", e)))?;
        let object = value
            .as_object()
            .ok_or_else(|| SyncError::InvalidExport("expected a JSON object".to_string()))?;

        let collection = object
            .get("collection")
            .ok_or_else(|| SyncError::InvalidExport("missing collection".to_string()))?;
        let collection: Collection = serde_json::from_value(collection.clone())
            .map_err(|e| SyncError::InvalidExport(format!("invalid collection: {}", e)))?;

        let version = object
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or(EXPORT_VERSION)
            .to_string();
        if version.split('.').next() != EXPORT_VERSION.split('.').next() {
            return Err(SyncError::InvalidExport(format!(
                "unsupported export version {}",
                version
            )));
        }

        let export_date = object
            .get("exportDate")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Self {
            collection,
            export_date,
            version,
        })
    }
}
