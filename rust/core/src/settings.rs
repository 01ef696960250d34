//! The singleton `settings` row.

use serde_json::Map;

use crate::backend::TableBackend;
use crate::prelude::*;
use crate::records::{RecordId, Table, nullable};

pub const SETTINGS_ROW_ID: i64 = 1;
pub const PLACEHOLDER_PIX_KEY: &str = "CHAVE PIX AQUI";

fn settings_row_id() -> i64 {
    SETTINGS_ROW_ID
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "settings_row_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub pix_key: String,
    /// Image of `pix_key` as a data URL; empty until generated.
    #[serde(default, deserialize_with = "nullable")]
    pub pix_qr_data_url: String,
    /// Columns this crate does not model. Kept so writes never drop them.
    #[serde(flatten)]
    pub extra: Map<String, Row>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_placeholder(PLACEHOLDER_PIX_KEY)
    }
}

impl Settings {
    pub fn with_placeholder(pix_key: impl Into<String>) -> Self {
        Self {
            id: SETTINGS_ROW_ID,
            pix_key: pix_key.into(),
            pix_qr_data_url: String::new(),
            extra: Map::new(),
        }
    }

    /// `self` with every field present in `patch` overwritten.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Settings> {
        let mut fields = match serde_json::to_value(self)? {
            Row::Object(fields) => fields,
            other => internal_bail!("settings serialized to a non-object: {other}"),
        };
        if let Row::Object(changes) = serde_json::to_value(patch)? {
            fields.extend(changes);
        }
        fields.insert("id".to_string(), Row::from(SETTINGS_ROW_ID));
        Ok(serde_json::from_value(Row::Object(fields))?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_qr_data_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Row>,
}

impl SettingsPatch {
    pub fn pix_key(key: impl Into<String>) -> Self {
        Self {
            pix_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn pix_qr_data_url(url: impl Into<String>) -> Self {
        Self {
            pix_qr_data_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<Row>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }
}

/// Holds the settings row. Writes apply locally first and are then upserted;
/// a stored row coming back replaces the local copy. A failed write keeps
/// the local change.
pub struct SettingsStore {
    backend: Arc<dyn TableBackend>,
    current: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn TableBackend>, initial: Settings) -> Self {
        Self {
            backend,
            current: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set(&self, settings: Settings) {
        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = settings;
    }

    /// Reads row 1. A missing row leaves the current settings in place.
    pub async fn load(&self) -> Result<Settings> {
        let rows = self
            .backend
            .select_by_id(Table::Settings.name(), &RecordId::Int(SETTINGS_ROW_ID))
            .await
            .context("load settings")?;
        match rows.into_iter().next() {
            Some(row) => {
                let stored: Settings =
                    serde_json::from_value(row).map_err(Error::from).context("decode settings")?;
                self.set(stored.clone());
                debug!("settings loaded");
                Ok(stored)
            }
            None => {
                debug!("no settings row stored, keeping defaults");
                Ok(self.current())
            }
        }
    }

    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        let next = self.current().merged(&patch)?;
        self.set(next.clone());

        let rows = self
            .backend
            .upsert(Table::Settings.name(), serde_json::to_value(&next)?, "id")
            .await
            .context("save settings")?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(next);
        };
        let stored: Settings = serde_json::from_value(row)
            .map_err(Error::from)
            .context("decode stored settings")?;
        self.set(stored.clone());
        debug!("settings saved");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{InjectedFailure, MemoryBackend, OfflineBackend};

    #[test]
    fn defaults_use_placeholder_key() {
        let settings = Settings::default();
        assert_eq!(settings.id, 1);
        assert_eq!(settings.pix_key, "CHAVE PIX AQUI");
        assert!(settings.pix_qr_data_url.is_empty());
    }

    #[test]
    fn decodes_nulls_and_unknown_columns() {
        let settings: Settings = serde_json::from_value(json!({
            "id": 1,
            "pix_key": "igreja@exemplo.com",
            "pix_qr_data_url": null,
            "church_name": "Comunidade"
        }))
        .unwrap();
        assert_eq!(settings.pix_qr_data_url, "");
        assert_eq!(settings.extra["church_name"], json!("Comunidade"));
    }

    #[tokio::test]
    async fn partial_patch_keeps_other_fields() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend.clone(), Settings::default());
        store
            .update(
                SettingsPatch::pix_key("a@b.c")
                    .with_extra("church_name", "Comunidade"),
            )
            .await
            .unwrap();
        store
            .update(SettingsPatch::pix_qr_data_url("data:x"))
            .await
            .unwrap();

        let current = store.current();
        assert_eq!(current.pix_key, "a@b.c");
        assert_eq!(current.pix_qr_data_url, "data:x");
        assert_eq!(current.extra["church_name"], json!("Comunidade"));
        assert_eq!(backend.rows("settings").len(), 1);
        assert_eq!(backend.rows("settings")[0]["pix_key"], json!("a@b.c"));
    }

    #[tokio::test]
    async fn stored_row_replaces_local_copy() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed("settings", [json!({"id": 1, "pix_key": "old", "theme": "dark"})])
            .unwrap();
        let store = SettingsStore::new(backend, Settings::default());

        let stored = store.update(SettingsPatch::pix_key("new")).await.unwrap();
        assert_eq!(stored.pix_key, "new");
        assert_eq!(stored.extra["theme"], json!("dark"));
        assert_eq!(store.current(), stored);
    }

    #[tokio::test]
    async fn failed_upsert_keeps_optimistic_merge() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_with(Some(InjectedFailure::Rejected(403)));
        let store = SettingsStore::new(backend, Settings::default());

        let err = store.update(SettingsPatch::pix_key("k")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(store.current().pix_key, "k");

        let offline = SettingsStore::new(Arc::new(OfflineBackend), Settings::default());
        assert!(offline.update(SettingsPatch::pix_key("k2")).await.is_err());
        assert_eq!(offline.current().pix_key, "k2");
    }

    #[tokio::test]
    async fn load_reads_row_one_or_keeps_defaults() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend.clone(), Settings::with_placeholder("chave"));
        assert_eq!(store.load().await.unwrap().pix_key, "chave");

        backend
            .seed("settings", [json!({"id": 1, "pix_key": "stored"})])
            .unwrap();
        assert_eq!(store.load().await.unwrap().pix_key, "stored");
        assert_eq!(store.current().pix_key, "stored");
    }
}
