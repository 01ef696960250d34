//! Portal lifecycle: builder, initial load, public reads and the admin panel.

use std::sync::Arc;

use congregate_core::auth::{AdminAllowList, AuthContext, AuthProvider, MemoryAuth, RestAuth, User};
use congregate_core::backend::{OfflineBackend, RestBackend, TableBackend};
use congregate_core::payment::{QrEncoder, QrOptions, SvgQrEncoder, generate_payment_qr};
use congregate_core::records::{
    AnyRecord, Course, Event, Group, Member, Notice, Order, Prayer, PrayerDraft, RecordId, Sermon,
    Table, Volunteer,
};
use congregate_core::settings::{Settings, SettingsPatch, SettingsStore};
use congregate_core::sync::TableHandle;
use congregate_core::views;
use congregate_utils::error::Error as CoreError;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::PortalConfig;
use crate::error::{Error, Result};

/// Number of events on the home page.
pub const UPCOMING_EVENTS: usize = 3;

// ---------------------------------------------------------------------------
// PortalBuilder
// ---------------------------------------------------------------------------

pub struct PortalBuilder {
    backend: Option<Arc<dyn TableBackend>>,
    auth: Option<Arc<dyn AuthProvider>>,
    admins: AdminAllowList,
    initial_settings: Settings,
    qr_encoder: Option<Arc<dyn QrEncoder>>,
    qr_options: QrOptions,
}

impl PortalBuilder {
    /// Table backend. Default: offline, every call fails as unavailable.
    pub fn backend(mut self, backend: Arc<dyn TableBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Auth provider. Default: in-process accounts, none registered.
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn admin_emails(mut self, admins: AdminAllowList) -> Self {
        self.admins = admins;
        self
    }

    /// Settings used until the stored row is loaded.
    pub fn initial_settings(mut self, settings: Settings) -> Self {
        self.initial_settings = settings;
        self
    }

    pub fn qr_encoder(mut self, encoder: Arc<dyn QrEncoder>) -> Self {
        self.qr_encoder = Some(encoder);
        self
    }

    pub fn qr_options(mut self, options: QrOptions) -> Self {
        self.qr_options = options;
        self
    }

    pub fn build(self) -> Portal {
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(OfflineBackend) as Arc<dyn TableBackend>);
        let auth = self
            .auth
            .unwrap_or_else(|| Arc::new(MemoryAuth::new()) as Arc<dyn AuthProvider>);
        let qr_encoder = self
            .qr_encoder
            .unwrap_or_else(|| Arc::new(SvgQrEncoder) as Arc<dyn QrEncoder>);

        Portal {
            inner: Arc::new(PortalInner {
                events: TableHandle::new(backend.clone()),
                sermons: TableHandle::new(backend.clone()),
                notices: TableHandle::new(backend.clone()),
                groups: TableHandle::new(backend.clone()),
                prayers: TableHandle::new(backend.clone()),
                members: TableHandle::new(backend.clone()),
                volunteers: TableHandle::new(backend.clone()),
                courses: TableHandle::new(backend.clone()),
                settings: SettingsStore::new(backend.clone(), self.initial_settings),
                backend,
                auth,
                admins: self.admins,
                qr_encoder,
                qr_options: self.qr_options,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Portal
// ---------------------------------------------------------------------------

struct PortalInner {
    backend: Arc<dyn TableBackend>,
    auth: Arc<dyn AuthProvider>,
    admins: AdminAllowList,
    events: TableHandle<Event>,
    sermons: TableHandle<Sermon>,
    notices: TableHandle<Notice>,
    groups: TableHandle<Group>,
    prayers: TableHandle<Prayer>,
    members: TableHandle<Member>,
    volunteers: TableHandle<Volunteer>,
    courses: TableHandle<Course>,
    settings: SettingsStore,
    qr_encoder: Arc<dyn QrEncoder>,
    qr_options: QrOptions,
}

/// One table handle per list table plus the settings row, the auth
/// provider and the admin allow-list, wired together for a session.
#[derive(Clone)]
pub struct Portal {
    inner: Arc<PortalInner>,
}

/// Outcome of [`Portal::load`]. Failed tables stay empty.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<(Table, usize)>,
    pub failed: Vec<(Table, CoreError)>,
}

impl LoadReport {
    fn record<T>(&mut self, table: Table, result: congregate_utils::error::Result<Vec<T>>) {
        match result {
            Ok(rows) => self.loaded.push((table, rows.len())),
            Err(err) => {
                warn!(%table, error = %err, "initial load failed");
                self.failed.push((table, err));
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Row count for `table`, if it loaded.
    pub fn count(&self, table: Table) -> Option<usize> {
        self.loaded
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, n)| *n)
    }
}

impl Portal {
    pub fn builder() -> PortalBuilder {
        PortalBuilder {
            backend: None,
            auth: None,
            admins: AdminAllowList::default(),
            initial_settings: Settings::default(),
            qr_encoder: None,
            qr_options: QrOptions::default(),
        }
    }

    /// Wires a REST backend and auth client sharing one session token, or
    /// runs offline when no backend is configured.
    pub fn from_config(config: &PortalConfig) -> Result<Portal> {
        let mut builder = Portal::builder()
            .admin_emails(AdminAllowList::from_csv(&config.admin_emails))
            .initial_settings(Settings::with_placeholder(
                config.payment.placeholder_key.as_str(),
            ))
            .qr_options(config.payment.qr_options());

        match &config.backend {
            Some(conn) => {
                let backend = RestBackend::new(conn)?;
                let auth = RestAuth::new(conn, backend.session())?;
                info!(url = backend.base_url(), "using REST backend");
                builder = builder.backend(Arc::new(backend)).auth(Arc::new(auth));
            }
            None => warn!("no backend configured, running offline"),
        }
        Ok(builder.build())
    }

    /// Loads every table and the settings row concurrently. Failures are
    /// tolerated and reported.
    pub async fn load(&self) -> LoadReport {
        let inner = &self.inner;
        let (events, sermons, notices, groups, prayers, members, volunteers, courses, settings) = futures::join!(
            inner.events.load(),
            inner.sermons.load(),
            inner.notices.load(),
            inner.groups.load(),
            inner.prayers.load(),
            inner.members.load(),
            inner.volunteers.load(),
            inner.courses.load(),
            inner.settings.load(),
        );

        let mut report = LoadReport::default();
        report.record(Table::Events, events);
        report.record(Table::Sermons, sermons);
        report.record(Table::Notices, notices);
        report.record(Table::Groups, groups);
        report.record(Table::Prayers, prayers);
        report.record(Table::Members, members);
        report.record(Table::Volunteers, volunteers);
        report.record(Table::Courses, courses);
        report.record(Table::Settings, settings.map(|s| vec![s]));
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "portal loaded"
        );
        report
    }

    pub fn events(&self) -> &TableHandle<Event> {
        &self.inner.events
    }

    pub fn sermons(&self) -> &TableHandle<Sermon> {
        &self.inner.sermons
    }

    pub fn notices(&self) -> &TableHandle<Notice> {
        &self.inner.notices
    }

    pub fn groups(&self) -> &TableHandle<Group> {
        &self.inner.groups
    }

    pub fn prayers(&self) -> &TableHandle<Prayer> {
        &self.inner.prayers
    }

    pub fn members(&self) -> &TableHandle<Member> {
        &self.inner.members
    }

    pub fn volunteers(&self) -> &TableHandle<Volunteer> {
        &self.inner.volunteers
    }

    pub fn courses(&self) -> &TableHandle<Course> {
        &self.inner.courses
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings.current()
    }

    pub fn upcoming_events(&self) -> Vec<Event> {
        views::upcoming(&self.inner.events.items(), UPCOMING_EVENTS)
    }

    pub fn event_schedule(&self) -> Vec<Event> {
        views::ascending_by_date(&self.inner.events.items())
    }

    pub fn sermon_feed(&self) -> Vec<Sermon> {
        views::descending_by_date(&self.inner.sermons.items())
    }

    pub fn notice_feed(&self) -> Vec<Notice> {
        views::descending_by_date(&self.inner.notices.items())
    }

    /// Open to everyone. A blank name is submitted as anonymous.
    pub async fn submit_prayer(&self, name: &str, request: &str) -> Result<Option<Prayer>> {
        let created = self
            .inner
            .prayers
            .add(&PrayerDraft::new(name, request))
            .await?;
        Ok(created.into_iter().next())
    }

    pub async fn auth_context(&self) -> Result<AuthContext> {
        let user = self.inner.auth.current_user().await?;
        Ok(AuthContext::new(user, self.inner.admins.clone()))
    }

    pub fn watch_session(&self) -> watch::Receiver<Option<User>> {
        self.inner.auth.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        Ok(self.inner.auth.sign_in_with_password(email, password).await?)
    }

    pub async fn sign_out(&self) -> Result<()> {
        Ok(self.inner.auth.sign_out().await?)
    }

    /// The admin panel, if the signed-in user is on the allow-list.
    pub async fn admin(&self) -> Result<AdminPanel> {
        let ctx = self.auth_context().await?;
        let user = ctx.require_admin()?.clone();
        Ok(AdminPanel {
            portal: self.clone(),
            user,
        })
    }

    /// Stops all list updates; operations still in flight are ignored.
    pub fn detach(&self) {
        let inner = &self.inner;
        inner.events.detach();
        inner.sermons.detach();
        inner.notices.detach();
        inner.groups.detach();
        inner.prayers.detach();
        inner.members.detach();
        inner.volunteers.detach();
        inner.courses.detach();
    }
}

// ---------------------------------------------------------------------------
// AdminPanel
// ---------------------------------------------------------------------------

/// Operations reserved to admins. Table edits go through the portal's
/// handles (`panel.portal().events().add(..)`).
pub struct AdminPanel {
    portal: Portal,
    user: User,
}

impl AdminPanel {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn portal(&self) -> &Portal {
        &self.portal
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        Ok(self.portal.inner.settings.update(patch).await?)
    }

    pub async fn generate_payment_qr(&self) -> Result<Settings> {
        let inner = &self.portal.inner;
        Ok(generate_payment_qr(&inner.settings, inner.qr_encoder.as_ref(), inner.qr_options).await?)
    }

    /// Flips `Novo` to `Atendido` and anything else to `Novo`. A prayer
    /// missing from the local list is read from the backend, and the list
    /// is left as it is.
    pub async fn toggle_prayer_status(&self, id: &RecordId) -> Result<Option<Prayer>> {
        let prayers = &self.portal.inner.prayers;
        let local = prayers.items().into_iter().find(|p| &p.id == id);
        let prayer = match local {
            Some(prayer) => prayer,
            None => match self.fetch_prayer(id).await? {
                Some(prayer) => prayer,
                None => return Ok(None),
            },
        };
        if let Some(updated) = prayers.update(id, &prayer.toggle_status_patch()).await? {
            return Ok(Some(updated));
        }
        self.fetch_prayer(id).await
    }

    async fn fetch_prayer(&self, id: &RecordId) -> Result<Option<Prayer>> {
        let rows = self
            .portal
            .inner
            .backend
            .select_by_id(Table::Prayers.name(), id)
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        match AnyRecord::from_row(Table::Prayers, row)? {
            AnyRecord::Prayer(prayer) => Ok(Some(prayer)),
            other => Err(Error::from(CoreError::internal_msg(format!(
                "expected a prayer row, got {other:?}"
            )))),
        }
    }

    /// Every row of `table`, newest first, straight from the backend.
    pub async fn list_table(&self, table: Table) -> Result<Vec<AnyRecord>> {
        if table == Table::Settings {
            return Err(CoreError::client("`settings` is not a list table").into());
        }
        let rows = self
            .portal
            .inner
            .backend
            .select(table.name(), Some(Order::desc("created_at")))
            .await?;
        let records = rows
            .into_iter()
            .map(|row| AnyRecord::from_row(table, row))
            .collect::<congregate_utils::error::Result<Vec<_>>>()?;
        Ok(records)
    }
}
