use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::Map;

use super::{TableBackend, as_object, validate_identifier};
use crate::prelude::*;
use crate::records::{Order, RecordId};
use crate::views::SortDirection;

/// Failure mode every subsequent call reports until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Unavailable,
    Rejected(u16),
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    last_id: i64,
    failure: Option<InjectedFailure>,
    calls: usize,
}

/// In-process table store. Generates integer ids and strictly increasing
/// `created_at` stamps; writes merge like the REST table API does.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    epoch: DateTime<Utc>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            epoch: Utc::now(),
        }
    }

    /// Stores `rows` in `table` as-is, assigning ids and stamps where missing.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) -> Result<()> {
        let mut state = self.lock();
        for row in rows {
            let fields = as_object(row)?;
            let row = self.stamp(&mut state, fields);
            state.tables.entry(table.to_string()).or_default().push(row);
        }
        Ok(())
    }

    pub fn fail_with(&self, failure: Option<InjectedFailure>) {
        self.lock().failure = failure;
    }

    /// Snapshot of a table in storage order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Number of calls received so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn begin(&self, table: &str) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        validate_identifier(table)?;
        let mut state = self.lock();
        state.calls += 1;
        match state.failure {
            None => Ok(state),
            Some(InjectedFailure::Unavailable) => {
                Err(Error::unavailable_msg("injected: backend unreachable"))
            }
            Some(InjectedFailure::Rejected(status)) => {
                Err(Error::rejected(status, "injected: request rejected"))
            }
        }
    }

    fn stamp(&self, state: &mut MemoryState, mut fields: Map<String, Row>) -> Row {
        state.last_id += 1;
        let seq = state.last_id;
        if !matches!(fields.get("id"), Some(id) if !id.is_null()) {
            fields.insert("id".to_string(), Row::from(seq));
        } else if let Some(existing) = fields.get("id").and_then(Row::as_i64) {
            state.last_id = state.last_id.max(existing);
        }
        if !fields.contains_key("created_at") {
            let created = self.epoch + TimeDelta::milliseconds(seq);
            fields.insert(
                "created_at".to_string(),
                Row::from(created.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        Row::Object(fields)
    }
}

fn id_matches(row: &Row, id: &RecordId) -> bool {
    match (row.get("id"), id) {
        (Some(Row::Number(n)), RecordId::Int(id)) => n.as_i64() == Some(*id),
        (Some(Row::String(s)), RecordId::Text(id)) => s == id,
        _ => false,
    }
}

fn merge_into(row: &mut Row, patch: Map<String, Row>) {
    if let Row::Object(fields) = row {
        fields.extend(patch);
    }
}

/// Ascending order with nulls last, mirroring the SQL default.
fn compare_values(a: Option<&Row>, b: Option<&Row>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Row::Number(a)), Some(Row::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Row::String(a)), Some(Row::String(b))) => a.cmp(b),
        (Some(Row::Bool(a)), Some(Row::Bool(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn select(&self, table: &str, order: Option<Order>) -> Result<Vec<Row>> {
        let state = self.begin(table)?;
        let mut rows = state.tables.get(table).cloned().unwrap_or_default();
        if let Some(order) = order {
            validate_identifier(order.field)?;
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(order.field), b.get(order.field));
                match order.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        Ok(rows)
    }

    async fn select_by_id(&self, table: &str, id: &RecordId) -> Result<Vec<Row>> {
        let state = self.begin(table)?;
        Ok(state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| id_matches(r, id)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>> {
        let mut state = self.begin(table)?;
        let rows = match row {
            Row::Array(rows) => rows,
            single => vec![single],
        };
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let fields = as_object(row)?;
            inserted.push(self.stamp(&mut state, fields));
        }
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> Result<Vec<Row>> {
        let mut state = self.begin(table)?;
        let patch = as_object(patch)?;
        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(vec![]);
        };
        let mut updated = vec![];
        for row in rows.iter_mut().filter(|r| id_matches(r, id)) {
            merge_into(row, patch.clone());
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Result<()> {
        let mut state = self.begin(table)?;
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|r| !id_matches(r, id));
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, row: Row, conflict_key: &str) -> Result<Vec<Row>> {
        validate_identifier(conflict_key)?;
        let mut state = self.begin(table)?;
        let fields = as_object(row)?;
        let key = fields.get(conflict_key).cloned().unwrap_or(Row::Null);

        let existing = state.tables.get_mut(table).and_then(|rows| {
            rows.iter_mut()
                .find(|r| !key.is_null() && r.get(conflict_key) == Some(&key))
        });
        if let Some(existing) = existing {
            merge_into(existing, fields);
            return Ok(vec![existing.clone()]);
        }

        let row = self.stamp(&mut state, fields);
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(vec![row])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_generates_id_and_created_at() {
        let backend = MemoryBackend::new();
        let first = backend.insert("notices", json!({"title": "a"})).await.unwrap();
        let second = backend.insert("notices", json!({"title": "b"})).await.unwrap();

        assert_eq!(first[0]["id"], json!(1));
        assert_eq!(second[0]["id"], json!(2));
        let a = first[0]["created_at"].as_str().unwrap();
        let b = second[0]["created_at"].as_str().unwrap();
        assert!(a < b);
        assert_eq!(backend.rows("notices").len(), 2);
    }

    #[tokio::test]
    async fn select_orders_with_nulls_last() {
        let backend = MemoryBackend::new();
        backend
            .seed(
                "events",
                [
                    json!({"date": "2024-03-01"}),
                    json!({"date": null}),
                    json!({"date": "2024-01-01"}),
                ],
            )
            .unwrap();

        let asc = backend.select("events", Some(Order::asc("date"))).await.unwrap();
        let dates: Vec<_> = asc.iter().map(|r| r["date"].clone()).collect();
        assert_eq!(dates, vec![json!("2024-01-01"), json!("2024-03-01"), Row::Null]);

        let desc = backend.select("events", Some(Order::desc("date"))).await.unwrap();
        assert_eq!(desc[0]["date"], Row::Null);
        assert_eq!(desc[1]["date"], json!("2024-03-01"));
    }

    #[tokio::test]
    async fn update_merges_and_reports_no_match() {
        let backend = MemoryBackend::new();
        backend
            .seed("prayers", [json!({"id": 5, "name": "Ana", "status": "Novo"})])
            .unwrap();

        let updated = backend
            .update("prayers", &RecordId::Int(5), json!({"status": "Atendido"}))
            .await
            .unwrap();
        assert_eq!(updated[0]["name"], json!("Ana"));
        assert_eq!(updated[0]["status"], json!("Atendido"));

        let none = backend
            .update("prayers", &RecordId::Int(99), json!({"status": "Novo"}))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn upsert_inserts_then_merges() {
        let backend = MemoryBackend::new();
        backend
            .upsert("settings", json!({"id": 1, "pix_key": "a", "theme": "dark"}), "id")
            .await
            .unwrap();
        let merged = backend
            .upsert("settings", json!({"id": 1, "pix_key": "b"}), "id")
            .await
            .unwrap();

        assert_eq!(merged[0]["pix_key"], json!("b"));
        assert_eq!(merged[0]["theme"], json!("dark"));
        assert_eq!(backend.rows("settings").len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_and_call_counting() {
        let backend = MemoryBackend::new();
        backend.fail_with(Some(InjectedFailure::Rejected(403)));
        let err = backend.insert("members", json!({"name": "x"})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);

        backend.fail_with(Some(InjectedFailure::Unavailable));
        let err = backend.delete("members", &RecordId::Int(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        backend.fail_with(None);
        backend.delete("members", &RecordId::Int(1)).await.unwrap();
        assert_eq!(backend.calls(), 3);
        assert!(backend.rows("members").is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_identifiers_and_non_objects() {
        let backend = MemoryBackend::new();
        assert!(backend.select("bad name", None).await.is_err());
        assert!(backend.insert("events", json!(3)).await.is_err());
    }
}
