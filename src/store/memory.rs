//! In-process implementation of [`RemoteStore`]
//!
//! Used as the offline backend (optionally snapshotted to a JSON file) and as
//! the injected fake in tests, where it can record calls and fail on demand.

use super::{
    compare_values, require_owner_column, require_owner_filter, timestamp, Filter, Order,
    RemoteStore, Row, StoreError, Table,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Kind of store operation, for call recording and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
    Delete,
}

/// One recorded call against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub table: Table,
}

#[derive(Debug)]
struct Fault {
    op: StoreOp,
    table: Option<Table>,
    skip: usize,
    remaining: usize,
}

/// In-memory relational store with the same scoping rules as the remote backend
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    snapshot_path: Option<PathBuf>,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<Vec<StoreCall>>,
    last_created: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryStore {
    /// An empty store that lives only as long as the process
    pub fn new() -> Self {
        Self::with_tables(HashMap::new(), None)
    }

    /// A store persisted to `path` after every write; loads the file if it exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Snapshot {
                path: path.clone(),
                source,
            })?;
            let named: HashMap<String, Vec<Row>> = serde_json::from_str(&content)?;
            let mut tables = HashMap::new();
            for table in Table::ALL {
                if let Some(rows) = named.get(table.name()) {
                    tables.insert(table, rows.clone());
                }
            }
            tables
        } else {
            HashMap::new()
        };

        tracing::debug!("memory store opened at {}", path.display());
        Ok(Self::with_tables(tables, Some(path)))
    }

    fn with_tables(tables: HashMap<Table, Vec<Row>>, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            tables: RwLock::new(tables),
            snapshot_path,
            faults: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            last_created: Mutex::new(None),
        }
    }

    /// Make the next `times` calls of `op` (on `table`, or any table) fail
    pub fn fail_next(&self, op: StoreOp, table: Option<Table>, times: usize) {
        self.fail_after(op, table, 0, times);
    }

    /// Let `skip` matching calls through, then fail the following `times`
    pub fn fail_after(&self, op: StoreOp, table: Option<Table>, skip: usize, times: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(Fault {
                op,
                table,
                skip,
                remaining: times,
            });
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Raw rows of a table, unscoped (test and diagnostics only)
    pub async fn rows(&self, table: Table) -> Vec<Row> {
        self.tables.read().await.get(&table).cloned().unwrap_or_default()
    }

    /// Insert a row without scoping checks or call recording, filling `id` and `created_at`
    pub async fn seed(&self, table: Table, row: Row) -> Row {
        let row = self.stamp(row);
        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .push(row.clone());
        row
    }

    fn record(&self, op: StoreOp, table: Table) -> Result<(), StoreError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(StoreCall { op, table });
        }

        let mut faults = match self.faults.lock() {
            Ok(faults) => faults,
            Err(_) => return Ok(()),
        };
        let hit = faults
            .iter_mut()
            .find(|f| f.op == op && f.remaining > 0 && f.table.map_or(true, |t| t == table));
        match hit {
            Some(fault) if fault.skip > 0 => {
                fault.skip -= 1;
                Ok(())
            }
            Some(fault) => {
                fault.remaining -= 1;
                faults.retain(|f| f.remaining > 0);
                Err(StoreError::unavailable(format!(
                    "injected {:?} failure on {}",
                    op, table
                )))
            }
            None => Ok(()),
        }
    }

    /// Assign id and a strictly increasing creation time where missing
    fn stamp(&self, mut row: Row) -> Row {
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            let mut now = Utc::now();
            if let Ok(mut last) = self.last_created.lock() {
                if let Some(prev) = *last {
                    if now <= prev {
                        now = prev + Duration::microseconds(1);
                    }
                }
                *last = Some(now);
            }
            row.insert("created_at".to_string(), Value::String(timestamp(now)));
        }
        row
    }

    async fn persist(&self, tables: &HashMap<Table, Vec<Row>>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let named: HashMap<&str, &Vec<Row>> =
            tables.iter().map(|(table, rows)| (table.name(), rows)).collect();
        let content = serde_json::to_string_pretty(&named)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Snapshot {
                    path: path.clone(),
                    source,
                })?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|source| StoreError::Snapshot {
                path: path.clone(),
                source,
            })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Row>, StoreError> {
        require_owner_filter(table, filters)?;
        self.record(StoreOp::Select, table)?;

        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            // stable: ties keep insertion order
            rows.sort_by(|a, b| {
                let ordering = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(a), Some(b)) => compare_values(a, b).unwrap_or(std::cmp::Ordering::Equal),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        require_owner_column(table, &row)?;
        self.record(StoreOp::Insert, table)?;

        let row = self.stamp(row);
        let mut tables = self.tables.write().await;
        tables.entry(table).or_default().push(row.clone());
        self.persist(&tables).await?;
        Ok(row)
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<(), StoreError> {
        require_owner_filter(table, filters)?;
        self.record(StoreOp::Update, table)?;

        let mut tables = self.tables.write().await;
        let mut touched = 0;
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows
                .iter_mut()
                .filter(|row| row_id(row) == Some(id) && filters.iter().all(|f| f.matches(row)))
            {
                for (column, value) in &patch {
                    if column != "id" && column != super::OWNER_COLUMN {
                        row.insert(column.clone(), value.clone());
                    }
                }
                touched += 1;
            }
        }
        if touched > 0 {
            self.persist(&tables).await?;
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str, filters: &[Filter]) -> Result<(), StoreError> {
        require_owner_filter(table, filters)?;
        self.record(StoreOp::Delete, table)?;

        let mut tables = self.tables.write().await;
        let mut removed = false;
        if let Some(rows) = tables.get_mut(&table) {
            let before = rows.len();
            rows.retain(|row| !(row_id(row) == Some(id) && filters.iter().all(|f| f.matches(row))));
            removed = rows.len() != before;
        }
        if removed {
            self.persist(&tables).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserId;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_identity() {
        let store = MemoryStore::new();
        let stored = store
            .insert(Table::Tasks, row(json!({"content": "a", "status": "todo", "user_id": "u1"})))
            .await
            .unwrap();

        assert!(stored.get("id").and_then(Value::as_str).is_some());
        assert!(stored.get("created_at").is_some());
        assert_eq!(store.rows(Table::Tasks).await.len(), 1);
    }

    #[tokio::test]
    async fn test_select_is_owner_scoped_and_ordered() {
        let store = MemoryStore::new();
        for (content, owner) in [("first", "u1"), ("other", "u2"), ("second", "u1")] {
            store
                .insert(Table::Tasks, row(json!({"content": content, "status": "todo", "user_id": owner})))
                .await
                .unwrap();
        }

        let rows = store
            .select(
                Table::Tasks,
                &[Filter::owner(&UserId::new("u1"))],
                Some(&Order::asc("created_at")),
            )
            .await
            .unwrap();
        let contents: Vec<_> = rows.iter().map(|r| r["content"].as_str().unwrap()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        let desc = store
            .select(
                Table::Tasks,
                &[Filter::owner(&UserId::new("u1"))],
                Some(&Order::desc("created_at")),
            )
            .await
            .unwrap();
        assert_eq!(desc[0]["content"], "second");
    }

    #[tokio::test]
    async fn test_unscoped_requests_are_rejected_before_recording() {
        let store = MemoryStore::new();
        let result = store.select(Table::Events, &[], None).await;
        assert!(matches!(result, Err(StoreError::MissingOwnerFilter { .. })));
        let result = store.insert(Table::Events, row(json!({"title": "x"}))).await;
        assert!(matches!(result, Err(StoreError::MissingOwnerFilter { .. })));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_respect_owner() {
        let store = MemoryStore::new();
        let stored = store
            .insert(Table::Tasks, row(json!({"content": "a", "status": "todo", "user_id": "u1"})))
            .await
            .unwrap();
        let id = stored["id"].as_str().unwrap().to_string();

        let intruder = [Filter::owner(&UserId::new("u2"))];
        store
            .update(Table::Tasks, &id, row(json!({"status": "done"})), &intruder)
            .await
            .unwrap();
        store.delete(Table::Tasks, &id, &intruder).await.unwrap();
        let rows = store.rows(Table::Tasks).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "todo");

        let owner = [Filter::owner(&UserId::new("u1"))];
        store
            .update(Table::Tasks, &id, row(json!({"status": "done", "user_id": "u2"})), &owner)
            .await
            .unwrap();
        let rows = store.rows(Table::Tasks).await;
        assert_eq!(rows[0]["status"], "done");
        assert_eq!(rows[0]["user_id"], "u1");

        store.delete(Table::Tasks, &id, &owner).await.unwrap();
        assert!(store.rows(Table::Tasks).await.is_empty());
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = MemoryStore::new();
        let owner = [Filter::owner(&UserId::new("u1"))];
        store.fail_next(StoreOp::Select, Some(Table::Tasks), 1);

        assert!(store.select(Table::Events, &owner, None).await.is_ok());
        assert!(matches!(
            store.select(Table::Tasks, &owner, None).await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.select(Table::Tasks, &owner, None).await.is_ok());

        store.fail_after(StoreOp::Select, None, 1, 1);
        assert!(store.select(Table::Tasks, &owner, None).await.is_ok());
        assert!(store.select(Table::Tasks, &owner, None).await.is_err());
        assert!(store.select(Table::Tasks, &owner, None).await.is_ok());
        assert_eq!(
            store.calls().iter().filter(|c| c.op == StoreOp::Select).count(),
            6
        );
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = MemoryStore::open(&path).unwrap();
        store
            .insert(Table::ChatHistory, row(json!({"message": "hi", "is_user": true, "user_id": "u1"})))
            .await
            .unwrap();
        assert!(path.exists());

        let reopened = MemoryStore::open(&path).unwrap();
        let rows = reopened.rows(Table::ChatHistory).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["message"], "hi");
    }
}
