//! HTTP transport for the spreadsheet backend.
//!
//! Reads are `GET endpoint?token=…&action=get_<table>` returning a JSON array
//! of records. Writes are `POST endpoint` with a JSON body naming the table,
//! the record or patch, and the operation; the response body is ignored.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::ReadCache;
use crate::store::{StoreConfig, StoreError, Table, TabularStore, WriteOp, WriteRequest};

/// reqwest-backed [`TabularStore`] with a time-bounded read cache.
pub struct HttpStore {
    client: reqwest::Client,
    config: StoreConfig,
    cache: ReadCache,
}

#[derive(Serialize)]
struct WriteBody<'a> {
    token: &'a str,
    table: Table,
    data: &'a Value,
    action: WriteOp,
    id_field: Option<&'a str>,
    id_value: Option<&'a str>,
}

impl<'a> WriteBody<'a> {
    fn new(token: &'a str, request: &'a WriteRequest) -> Self {
        Self {
            token,
            table: request.table,
            data: &request.data,
            action: request.op,
            id_field: request.key.as_ref().map(|(field, _)| field.as_str()),
            id_value: request.key.as_ref().map(|(_, value)| value.as_str()),
        }
    }
}

impl HttpStore {
    /// Create a store for the configured endpoint. Every request is bounded
    /// by `config.timeout`.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let cache = ReadCache::new(config.cache_ttl);
        Ok(Self {
            client,
            config,
            cache,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Drop the table's cache entry once a write has returned, so rows read
    /// while it was in flight are not served afterwards. A failed write may
    /// still have landed upstream, so failures invalidate too.
    fn settle_write(&self, table: Table, result: &Result<(), StoreError>) {
        self.cache.invalidate(table);
        if let Err(e) = result {
            warn!(%table, error = %e, "write was not confirmed");
        }
    }

    async fn request_rows(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        info!(url = %self.config.endpoint, action = table.read_action(), "fetching table");
        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("token", self.config.token.as_str()),
                ("action", table.read_action()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let rows = parse_rows(&body)?;
        info!(%table, count = rows.len(), "fetched table");
        Ok(rows)
    }

    async fn try_write(&self, request: &WriteRequest) -> Result<(), StoreError> {
        info!(
            url = %self.config.endpoint,
            table = %request.table,
            op = ?request.op,
            "writing record"
        );
        let body = WriteBody::new(&self.config.token, request);
        let resp = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Parse a read response. Anything other than a JSON array is an error.
fn parse_rows(body: &str) -> Result<Vec<Value>, StoreError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(rows) => Ok(rows),
        other => Err(StoreError::Other(format!(
            "expected a JSON array of records, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl TabularStore for HttpStore {
    async fn try_fetch(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        if let Some(rows) = self.cache.get(table) {
            debug!(%table, count = rows.len(), "cache hit");
            return Ok(rows);
        }
        let rows = self.request_rows(table).await?;
        self.cache.put(table, rows.clone());
        Ok(rows)
    }

    async fn write(&self, request: &WriteRequest) -> Result<(), StoreError> {
        self.cache.invalidate(request.table);
        let result = self.try_write(request).await;
        self.settle_write(request.table, &result);
        result
    }
}
