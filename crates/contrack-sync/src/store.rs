//! The tabular store seam: what the ledger needs from a backend.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Connection settings for the backend, passed in at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Single endpoint serving both reads and writes.
    pub endpoint: String,
    /// Shared secret sent with every request.
    pub token: String,
    /// Upper bound on each request; a timed-out call counts as failed.
    pub timeout: Duration,
    /// How long a read stays fresh. Zero disables caching.
    pub cache_ttl: Duration,
}

impl StoreConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
        }
    }
}

/// Record collections held by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Contracts,
    Items,
    Measurements,
}

impl Table {
    /// Table name used in write requests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Contracts => "contracts",
            Self::Items => "items",
            Self::Measurements => "measurements",
        }
    }

    /// `action` parameter that lists this table.
    pub fn read_action(&self) -> &'static str {
        match self {
            Self::Contracts => "get_contracts",
            Self::Items => "get_items",
            Self::Measurements => "get_measurements",
        }
    }

    /// Column holding each record's identifier.
    pub fn key_field(&self) -> &'static str {
        match self {
            Self::Contracts => "contract_id",
            Self::Items => "item_id",
            Self::Measurements => "measurement_id",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Table {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

/// One write against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub table: Table,
    pub op: WriteOp,
    pub data: Value,
    /// Identifier column and value selecting the row for update/delete.
    pub key: Option<(String, String)>,
}

impl WriteRequest {
    pub fn create(table: Table, data: Value) -> Self {
        Self {
            table,
            op: WriteOp::Create,
            data,
            key: None,
        }
    }

    pub fn update(table: Table, id: &str, data: Value) -> Self {
        Self {
            table,
            op: WriteOp::Update,
            data,
            key: Some((table.key_field().to_string(), id.to_string())),
        }
    }

    pub fn delete(table: Table, id: &str) -> Self {
        Self {
            table,
            op: WriteOp::Delete,
            data: Value::Object(Default::default()),
            key: Some((table.key_field().to_string(), id.to_string())),
        }
    }
}

/// A backend holding the three record collections.
///
/// Page reads go through [`fetch`](TabularStore::fetch), where any error is
/// logged and surfaces as an empty table. Paths that must not act on a
/// missing table (the deletion guard) use
/// [`try_fetch`](TabularStore::try_fetch) instead. Writes report failure so
/// the caller can decide whether to say so.
#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn try_fetch(&self, table: Table) -> Result<Vec<Value>, StoreError>;

    async fn write(&self, request: &WriteRequest) -> Result<(), StoreError>;

    async fn fetch(&self, table: Table) -> Vec<Value> {
        match self.try_fetch(table).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%table, error = %e, "read failed; treating table as empty");
                Vec::new()
            }
        }
    }
}
