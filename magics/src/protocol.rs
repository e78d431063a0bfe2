//! Snowflake SQL API v2 Protocol Types
//!
//! Request and response bodies of `/api/v2/statements`, seen from the client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// SQL execution request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRequest {
    /// SQL statement to execute
    pub statement: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Session parameters
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
}

impl StatementRequest {
    /// Create a single-statement request
    pub fn new(statement: &str) -> Self {
        let mut parameters = HashMap::new();
        // One statement per request; the cell splitter handles batches
        parameters.insert("MULTI_STATEMENT_COUNT".to_string(), "1".to_string());

        Self {
            statement: statement.to_string(),
            timeout: None,
            database: None,
            schema: None,
            warehouse: None,
            role: None,
            parameters,
        }
    }
}

/// SQL execution response (HTTP 200) and partition response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    /// Result rows, each cell as string
    #[serde(default)]
    pub data: Option<Vec<Vec<Option<String>>>>,

    #[serde(default)]
    pub result_set_meta_data: Option<ResultSetMetaData>,

    #[serde(default)]
    pub statement_handle: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// DML statistics
    #[serde(default)]
    pub stats: Option<Stats>,
}

/// Result set metadata
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetMetaData {
    #[serde(default)]
    pub num_rows: i64,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub row_type: Vec<ColumnMetaData>,

    #[serde(default)]
    pub partition_info: Option<Vec<PartitionInfo>>,

    // Some servers report DML counts here rather than in `stats`
    #[serde(default)]
    pub num_rows_inserted: Option<i64>,

    #[serde(default)]
    pub num_rows_updated: Option<i64>,

    #[serde(default)]
    pub num_rows_deleted: Option<i64>,
}

/// Column metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetaData {
    pub name: String,

    /// Snowflake data type
    pub r#type: String,

    #[serde(default)]
    pub scale: Option<i32>,

    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Partition information
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    #[serde(default)]
    pub row_count: i64,
}

/// DML statistics
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub num_rows_inserted: Option<i64>,

    #[serde(default)]
    pub num_rows_updated: Option<i64>,

    #[serde(default)]
    pub num_rows_deleted: Option<i64>,
}

/// Error response (HTTP 4xx/5xx)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub sql_state: Option<String>,

    #[serde(default)]
    pub statement_handle: Option<String>,
}

impl StatementResponse {
    /// Affected rows: inserted + updated + deleted
    pub fn affected_rows(&self) -> Option<i64> {
        let counts = match (&self.stats, &self.result_set_meta_data) {
            (Some(stats), _) => [
                stats.num_rows_inserted,
                stats.num_rows_updated,
                stats.num_rows_deleted,
            ],
            (None, Some(meta)) => [
                meta.num_rows_inserted,
                meta.num_rows_updated,
                meta.num_rows_deleted,
            ],
            (None, None) => [None, None, None],
        };

        if counts.iter().any(Option::is_some) {
            return Some(counts.iter().flatten().sum());
        }

        // Single-cell "number of rows ..." result
        self.data
            .as_ref()
            .and_then(|rows| rows.first())
            .and_then(|row| row.first())
            .and_then(|cell| cell.as_deref())
            .and_then(|cell| cell.parse().ok())
    }
}
