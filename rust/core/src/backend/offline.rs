use super::TableBackend;
use crate::prelude::*;
use crate::records::{Order, RecordId};

/// Stand-in used when no backend is configured: every call fails as
/// unavailable, so reads come back empty and writes leave lists alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

fn offline<T>(op: &str, table: &str) -> Result<T> {
    Err(Error::unavailable_msg(format!(
        "no backend configured ({op} on `{table}`)"
    )))
}

#[async_trait]
impl TableBackend for OfflineBackend {
    async fn select(&self, table: &str, _order: Option<Order>) -> Result<Vec<Row>> {
        offline("select", table)
    }

    async fn select_by_id(&self, table: &str, _id: &RecordId) -> Result<Vec<Row>> {
        offline("select", table)
    }

    async fn insert(&self, table: &str, _row: Row) -> Result<Vec<Row>> {
        offline("insert", table)
    }

    async fn update(&self, table: &str, _id: &RecordId, _patch: Row) -> Result<Vec<Row>> {
        offline("update", table)
    }

    async fn delete(&self, table: &str, _id: &RecordId) -> Result<()> {
        offline("delete", table)
    }

    async fn upsert(&self, table: &str, _row: Row, _conflict_key: &str) -> Result<Vec<Row>> {
        offline("upsert", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_is_unavailable() {
        let backend = OfflineBackend;
        let err = backend.select("events", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        let err = backend.delete("events", &RecordId::Int(1)).await.unwrap_err();
        assert!(err.to_string().contains("delete on `events`"));
    }
}
