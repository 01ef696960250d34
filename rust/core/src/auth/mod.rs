//! Who is signed in, and whether they may use the admin panel.

use tokio::sync::watch;

use crate::prelude::*;

mod memory;
mod rest;

pub use memory::MemoryAuth;
pub use rest::RestAuth;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// E-mail addresses allowed into the admin panel. Matching is exact and
/// case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList(Vec<String>);

impl AdminAllowList {
    pub fn new<S: Into<String>>(emails: impl IntoIterator<Item = S>) -> Self {
        Self(emails.into_iter().map(Into::into).collect())
    }

    /// Parses `"a@x.org, b@x.org"`. Entries are trimmed; empty ones dropped.
    pub fn from_csv(csv: &str) -> Self {
        Self(
            csv.split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, email: &str) -> bool {
        self.0.iter().any(|e| e == email)
    }

    pub fn emails(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything an operation needs to decide on authorization.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user: Option<User>,
    pub admins: AdminAllowList,
}

impl AuthContext {
    pub fn new(user: Option<User>, admins: AdminAllowList) -> Self {
        Self { user, admins }
    }

    pub fn is_admin(&self) -> bool {
        is_admin(self)
    }

    pub fn require_admin(&self) -> Result<&User> {
        match &self.user {
            Some(user) if is_admin(self) => Ok(user),
            Some(user) => client_bail!(
                "`{}` is not allowed to use the admin panel",
                user.email.as_deref().unwrap_or(&user.id)
            ),
            None => client_bail!("sign in to use the admin panel"),
        }
    }
}

pub fn is_admin(ctx: &AuthContext) -> bool {
    ctx.user
        .as_ref()
        .and_then(|user| user.email.as_deref())
        .is_some_and(|email| ctx.admins.contains(email))
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<User>>;

    /// Receives the signed-in user on every sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User>;

    async fn sign_out(&self) -> Result<()>;
}

/// Broadcasts session changes to subscribers.
pub struct SessionHub {
    tx: watch::Sender<Option<User>>,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    /// Subscribers are only woken when the user actually changes.
    pub fn publish(&self, user: Option<User>) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == user {
                return false;
            }
            *current = user.clone();
            true
        });
        if changed {
            match &user {
                Some(user) => info!(user_id = %user.id, "signed in"),
                None => info!("signed out"),
            }
        }
    }
}
