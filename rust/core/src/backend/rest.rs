use reqwest::{Client, RequestBuilder};
use utils::http::request;

use super::{TableBackend, validate_identifier};
use crate::prelude::*;
use crate::records::{Order, RecordId};

const RETURN_ROWS: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RestConnection {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public (anon) API key.
    pub api_key: String,
}

/// Access token of the signed-in user, shared between the auth client and
/// the table client. Requests fall back to the API key when it is empty.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(Arc<RwLock<Option<String>>>);

impl SessionToken {
    pub fn get(&self) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, token: Option<String>) {
        *self
            .0
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }
}

/// Client for a PostgREST-style table API (`/rest/v1/<table>`).
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    session: SessionToken,
}

impl RestBackend {
    pub fn new(conn: &RestConnection) -> Result<Self> {
        Self::with_session(Client::new(), conn, SessionToken::default())
    }

    pub fn with_session(
        client: Client,
        conn: &RestConnection,
        session: SessionToken,
    ) -> Result<Self> {
        let base_url = conn.url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            client_bail!("backend url must not be empty");
        }
        if conn.api_key.trim().is_empty() {
            client_bail!("backend api key must not be empty");
        }
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: conn.api_key.trim().to_string(),
            session,
        })
    }

    pub fn session(&self) -> SessionToken {
        self.session.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> Result<String> {
        let table = validate_identifier(table)?;
        Ok(format!("{}/rest/v1/{table}", self.base_url))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self.session.get().unwrap_or_else(|| self.api_key.clone());
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn rows(&self, builder: RequestBuilder) -> Result<Vec<Row>> {
        let builder = self.authorize(builder);
        let resp = request(&self.client, move |_| builder).await?;
        Ok(resp.json::<Vec<Row>>().await?)
    }
}

fn id_filter(id: &RecordId) -> (&'static str, String) {
    ("id", format!("eq.{id}"))
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn select(&self, table: &str, order: Option<Order>) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        let mut query = vec![("select", "*".to_string())];
        if let Some(order) = order {
            let field = validate_identifier(order.field)?;
            query.push(("order", format!("{field}.{}", order.direction.as_str())));
        }
        self.rows(self.client.get(url).query(&query))
            .await
            .with_context(|| format!("select from `{table}`"))
    }

    async fn select_by_id(&self, table: &str, id: &RecordId) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        self.rows(
            self.client
                .get(url)
                .query(&[("select", "*".to_string()), id_filter(id)]),
        )
        .await
        .with_context(|| format!("select `{table}` row {id}"))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        self.rows(
            self.client
                .post(url)
                .query(&[("select", "*")])
                .header("Prefer", RETURN_ROWS)
                .json(&row),
        )
        .await
        .with_context(|| format!("insert into `{table}`"))
    }

    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        self.rows(
            self.client
                .patch(url)
                .query(&[("select", "*".to_string()), id_filter(id)])
                .header("Prefer", RETURN_ROWS)
                .json(&patch),
        )
        .await
        .with_context(|| format!("update `{table}` row {id}"))
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Result<()> {
        let url = self.table_url(table)?;
        let builder = self.authorize(
            self.client
                .delete(url)
                .query(&[id_filter(id)])
                .header("Prefer", "return=minimal"),
        );
        request(&self.client, move |_| builder)
            .await
            .with_context(|| format!("delete `{table}` row {id}"))?;
        Ok(())
    }

    async fn upsert(&self, table: &str, row: Row, conflict_key: &str) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        let conflict_key = validate_identifier(conflict_key)?;
        self.rows(
            self.client
                .post(url)
                .query(&[("select", "*"), ("on_conflict", conflict_key)])
                .header("Prefer", MERGE_DUPLICATES)
                .json(&row),
        )
        .await
        .with_context(|| format!("upsert into `{table}`"))
    }
}
