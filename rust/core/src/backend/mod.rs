//! The table API the portal talks to.
//!
//! Rows travel as JSON objects; typing happens one layer up, in
//! [`crate::sync`]. Every write returns the affected rows as the backend
//! stored them.

use crate::prelude::*;
use crate::records::{Order, RecordId};

mod memory;
mod offline;
mod rest;

pub use memory::{InjectedFailure, MemoryBackend};
pub use offline::OfflineBackend;
pub use rest::{RestBackend, RestConnection, SessionToken};

#[async_trait]
pub trait TableBackend: Send + Sync {
    /// All rows, ordered by `order` when given.
    async fn select(&self, table: &str, order: Option<Order>) -> Result<Vec<Row>>;

    async fn select_by_id(&self, table: &str, id: &RecordId) -> Result<Vec<Row>>;

    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>>;

    /// Rows matching `id` after `patch` was applied; empty when none matched.
    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> Result<Vec<Row>>;

    async fn delete(&self, table: &str, id: &RecordId) -> Result<()>;

    /// Insert, or merge into the row whose `conflict_key` column matches.
    async fn upsert(&self, table: &str, row: Row, conflict_key: &str) -> Result<Vec<Row>>;
}

/// Table and column names go into URLs and queries verbatim, so only plain
/// identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if name.is_empty() {
        client_bail!("identifier must not be empty");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        client_bail!("`{name}` is not a valid table or column identifier");
    }
    Ok(name)
}

fn as_object(row: Row) -> Result<serde_json::Map<String, Row>> {
    match row {
        Row::Object(fields) => Ok(fields),
        other => client_bail!("expected a JSON object row, got `{other}`"),
    }
}
