use std::collections::HashMap;

use tokio::sync::watch;

use super::{AuthProvider, SessionHub, User};
use crate::prelude::*;

struct Account {
    password: String,
    user: User,
}

/// In-process accounts. Used by tests and when no backend is configured.
#[derive(Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    hub: SessionHub,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.add_account(email, password);
        self
    }

    pub fn add_account(&self, email: &str, password: &str) -> User {
        let mut accounts = self.lock();
        let user = User {
            id: format!("user-{}", accounts.len() + 1),
            email: Some(email.to_string()),
        };
        accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Account>> {
        self.accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.hub.current())
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.hub.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User> {
        let user = {
            let accounts = self.lock();
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(Error::rejected(400, "Invalid login credentials")),
            }
        };
        self.hub.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.hub.publish(None);
        Ok(())
    }
}
