//! Time-bounded cache of table reads.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::store::Table;

/// Per-table read cache. Entries older than `ttl` are ignored; writes
/// invalidate the table they touch. A zero `ttl` disables caching.
pub struct ReadCache {
    ttl: Duration,
    entries: Mutex<HashMap<Table, (Instant, Vec<Value>)>>,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, table: Table) -> Option<Vec<Value>> {
        self.get_at(table, Instant::now())
    }

    fn get_at(&self, table: Table, now: Instant) -> Option<Vec<Value>> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&table)
            .filter(|(stored, _)| now.saturating_duration_since(*stored) < self.ttl)
            .map(|(_, rows)| rows.clone())
    }

    pub fn put(&self, table: Table, rows: Vec<Value>) {
        self.put_at(table, rows, Instant::now());
    }

    fn put_at(&self, table: Table, rows: Vec<Value>, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(table, (now, rows));
    }

    pub fn invalidate(&self, table: Table) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&table);
    }
}
