use crate::backend::TableBackend;
use crate::prelude::*;
use crate::records::{InsertPosition, Record, RecordId};

use super::list::{ListSetter, SharedList};

/// Keeps a local list of `R` in step with the backend table `R::TABLE`.
///
/// Every operation reports its outcome. The list transitions are:
///
/// * `add`: on success the created rows land at the configured end of the
///   list; on failure the list is untouched.
/// * `update`: on success the server row is merged over the local entry,
///   server fields winning; on failure, or when no local entry matches, the
///   list is untouched.
/// * `delete`: eventually-consistent delete. The local entry is removed
///   whatever the backend answers, and the backend outcome is still returned.
pub struct TableSync<R: Record> {
    backend: Arc<dyn TableBackend>,
    list: Arc<dyn ListSetter<R>>,
    position: InsertPosition,
}

impl<R: Record> Clone for TableSync<R> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            list: self.list.clone(),
            position: self.position,
        }
    }
}

impl<R: Record> TableSync<R> {
    pub fn new(
        backend: Arc<dyn TableBackend>,
        list: Arc<dyn ListSetter<R>>,
        position: InsertPosition,
    ) -> Self {
        Self {
            backend,
            list,
            position,
        }
    }

    /// Uses the insertion position registered for `R::TABLE`.
    pub fn for_table(backend: Arc<dyn TableBackend>, list: Arc<dyn ListSetter<R>>) -> Self {
        Self::new(backend, list, R::TABLE.insert_position())
    }

    pub fn position(&self) -> InsertPosition {
        self.position
    }

    pub async fn add(&self, draft: &R::Draft) -> Result<Vec<R>> {
        let table = R::TABLE;
        R::validate_draft(draft)?;
        let row = serde_json::to_value(draft)?;
        let rows = self
            .backend
            .insert(table.name(), row)
            .await
            .with_context(|| format!("add to `{table}`"))?;
        let created = decode_rows::<R>(rows).with_context(|| format!("add to `{table}`"))?;

        let incoming = created.clone();
        let position = self.position;
        self.list
            .apply(Box::new(move |list| merge_created(list, incoming, position)));
        debug!(%table, count = created.len(), "records added");
        Ok(created)
    }

    /// Returns the merged entry, or `None` when the list holds no entry with
    /// `id` or the backend matched no row.
    pub async fn update(&self, id: &RecordId, patch: &R::Patch) -> Result<Option<R>> {
        let table = R::TABLE;
        let patch = serde_json::to_value(patch)?;
        let rows = self
            .backend
            .update(table.name(), id, patch)
            .await
            .with_context(|| format!("update `{table}` row {id}"))?;
        let Some(server_row) = rows.into_iter().next() else {
            debug!(%table, %id, "update matched no row");
            return Ok(None);
        };

        let mut outcome: Option<Result<R>> = None;
        let slot = &mut outcome;
        self.list.apply(Box::new(move |mut list| {
            if let Some(entry) = list.iter_mut().find(|r| r.id() == id) {
                *slot = Some(match merge_server_row(entry, server_row) {
                    Ok(merged) => {
                        *entry = merged.clone();
                        Ok(merged)
                    }
                    Err(err) => Err(err),
                });
            }
            list
        }));

        match outcome {
            Some(Ok(merged)) => {
                debug!(%table, %id, "record updated");
                Ok(Some(merged))
            }
            Some(Err(err)) => {
                Err::<Option<R>, Error>(err).with_context(|| format!("update `{table}` row {id}"))
            }
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        let table = R::TABLE;
        let result = self
            .backend
            .delete(table.name(), id)
            .await
            .with_context(|| format!("delete `{table}` row {id}"));

        let target = id.clone();
        self.list.apply(Box::new(move |mut list| {
            list.retain(|r| r.id() != &target);
            list
        }));
        match &result {
            Ok(()) => debug!(%table, %id, "record deleted"),
            Err(err) if err.is_backend_failure() => {
                debug!(%table, %id, error = %err, "record removed locally, backend delete failed")
            }
            Err(err) => warn!(%table, %id, error = %err, "record removed locally, delete not sent"),
        }
        result
    }

    /// Initial select with the table's ordering; replaces the list.
    /// Rows that do not decode are skipped.
    pub async fn load(&self) -> Result<Vec<R>> {
        let table = R::TABLE;
        let rows = self
            .backend
            .select(table.name(), table.initial_order())
            .await
            .with_context(|| format!("load `{table}`"))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<R>(row) {
                Ok(record) => records.push(record),
                Err(err) => warn!(%table, error = %err, "skipping malformed row"),
            }
        }
        let replacement = records.clone();
        self.list.apply(Box::new(move |_| replacement));
        debug!(%table, count = records.len(), "table loaded");
        Ok(records)
    }
}

fn decode_rows<R: Record>(rows: Vec<Row>) -> Result<Vec<R>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).internal())
        .collect()
}

/// Created rows replace any entries carrying the same id, so the list never
/// holds two entries for one id.
fn merge_created<R: Record>(list: Vec<R>, incoming: Vec<R>, position: InsertPosition) -> Vec<R> {
    let incoming_ids: Vec<RecordId> = incoming.iter().map(|r| r.id().clone()).collect();
    let kept = list
        .into_iter()
        .filter(|existing| !incoming_ids.contains(existing.id()));
    match position {
        InsertPosition::Front => incoming.into_iter().chain(kept).collect(),
        InsertPosition::Back => kept.chain(incoming).collect(),
    }
}

fn merge_server_row<R: Record>(local: &R, server_row: Row) -> Result<R> {
    let mut merged = serde_json::to_value(local)?;
    match (&mut merged, server_row) {
        (Row::Object(fields), Row::Object(server_fields)) => fields.extend(server_fields),
        (_, other) => internal_bail!("backend returned a non-object row: {other}"),
    }
    Ok(serde_json::from_value(merged)?)
}

/// A list table: its local list paired with the wrapper that keeps it in
/// sync. One handle per table lives for the whole session.
pub struct TableHandle<R: Record> {
    list: Arc<SharedList<R>>,
    sync: TableSync<R>,
}

impl<R: Record> Clone for TableHandle<R> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            sync: self.sync.clone(),
        }
    }
}

impl<R: Record> TableHandle<R> {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self::with_position(backend, R::TABLE.insert_position())
    }

    pub fn with_position(backend: Arc<dyn TableBackend>, position: InsertPosition) -> Self {
        let list = Arc::new(SharedList::default());
        let sync = TableSync::new(backend, list.clone(), position);
        Self { list, sync }
    }

    pub fn list(&self) -> &Arc<SharedList<R>> {
        &self.list
    }

    pub fn sync(&self) -> &TableSync<R> {
        &self.sync
    }

    /// Current list contents.
    pub fn items(&self) -> Vec<R> {
        self.list.snapshot()
    }

    pub async fn add(&self, draft: &R::Draft) -> Result<Vec<R>> {
        self.sync.add(draft).await
    }

    pub async fn update(&self, id: &RecordId, patch: &R::Patch) -> Result<Option<R>> {
        self.sync.update(id, patch).await
    }

    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        self.sync.delete(id).await
    }

    pub async fn load(&self) -> Result<Vec<R>> {
        self.sync.load().await
    }

    pub fn detach(&self) {
        self.list.detach();
    }
}
