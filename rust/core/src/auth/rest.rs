use reqwest::Client;
use tokio::sync::watch;
use utils::http::request;

use super::{AuthProvider, SessionHub, User};
use crate::backend::{RestConnection, SessionToken};
use crate::prelude::*;

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: User,
}

/// Client for the hosted auth service (`/auth/v1`). The access token is
/// written to the shared [`SessionToken`], so table requests made by a
/// `RestBackend` on the same token carry the signed-in user.
pub struct RestAuth {
    client: Client,
    base_url: String,
    api_key: String,
    session: SessionToken,
    hub: SessionHub,
}

impl RestAuth {
    pub fn new(conn: &RestConnection, session: SessionToken) -> Result<Self> {
        Self::with_client(Client::new(), conn, session)
    }

    pub fn with_client(
        client: Client,
        conn: &RestConnection,
        session: SessionToken,
    ) -> Result<Self> {
        let base_url = conn.url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            client_bail!("auth url must not be empty");
        }
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: conn.api_key.trim().to_string(),
            session,
            hub: SessionHub::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn clear_session(&self) {
        self.session.set(None);
        self.hub.publish(None);
    }
}

#[async_trait]
impl AuthProvider for RestAuth {
    /// Asks the auth service who the stored token belongs to. An expired or
    /// revoked token ends the session.
    async fn current_user(&self) -> Result<Option<User>> {
        let Some(token) = self.session.get() else {
            return Ok(None);
        };
        let url = self.url("user");
        let result = request(&self.client, |c| {
            c.get(url)
                .header("apikey", &self.api_key)
                .bearer_auth(&token)
        })
        .await;
        match result {
            Ok(resp) => {
                let user: User = resp.json().await?;
                self.hub.publish(Some(user.clone()));
                Ok(Some(user))
            }
            Err(err) if matches!(err.without_contexts(), Error::Rejected { status: 401, .. }) => {
                debug!("session token no longer valid");
                self.clear_session();
                Ok(None)
            }
            Err(err) => Err(err).context("look up current user"),
        }
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.hub.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User> {
        let url = self.url("token");
        let resp = request(&self.client, |c| {
            c.post(url)
                .query(&[("grant_type", "password")])
                .header("apikey", &self.api_key)
                .json(&PasswordGrant { email, password })
        })
        .await
        .context("sign in")?;
        let token: TokenResponse = resp.json().await?;

        self.session.set(Some(token.access_token));
        self.hub.publish(Some(token.user.clone()));
        Ok(token.user)
    }

    /// The local session is cleared even when the logout call fails.
    async fn sign_out(&self) -> Result<()> {
        let Some(token) = self.session.get() else {
            self.hub.publish(None);
            return Ok(());
        };
        let url = self.url("logout");
        let result = request(&self.client, |c| {
            c.post(url)
                .header("apikey", &self.api_key)
                .bearer_auth(&token)
        })
        .await;
        self.clear_session();
        result.context("sign out")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };
    use serde_json::json;
    use std::collections::HashMap;

    use super::*;

    const TOKEN: &str = "jwt-123";

    fn bearer(headers: &HeaderMap) -> Option<&str> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    async fn token(
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Row>,
    ) -> (StatusCode, Json<Row>) {
        let email = body["email"].clone();
        if query.get("grant_type").map(String::as_str) == Some("password")
            && body["password"] == json!("senha")
        {
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": TOKEN,
                    "token_type": "bearer",
                    "expires_in": 3600,
                    "user": {"id": "u-1", "email": email}
                })),
            )
        } else {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
            )
        }
    }

    async fn user(headers: HeaderMap) -> (StatusCode, Json<Row>) {
        match bearer(&headers) {
            Some(TOKEN) => (
                StatusCode::OK,
                Json(json!({"id": "u-1", "email": "pastor@igreja.org", "role": "authenticated"})),
            ),
            _ => (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"}))),
        }
    }

    async fn logout(headers: HeaderMap) -> StatusCode {
        match bearer(&headers) {
            Some(TOKEN) => StatusCode::NO_CONTENT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    async fn serve() -> RestConnection {
        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/user", get(user))
            .route("/auth/v1/logout", post(logout));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        RestConnection {
            url: format!("http://{addr}"),
            api_key: "anon-key".to_string(),
        }
    }

    #[tokio::test]
    async fn password_sign_in_shares_token() {
        let conn = serve().await;
        let session = SessionToken::default();
        let auth = RestAuth::new(&conn, session.clone()).unwrap();
        let mut rx = auth.subscribe();

        let err = auth
            .sign_in_with_password("pastor@igreja.org", "errada")
            .await
            .unwrap_err();
        assert!(matches!(
            err.without_contexts(),
            Error::Rejected { status: 400, msg } if msg == "Invalid login credentials"
        ));
        assert_eq!(session.get(), None);

        let signed_in = auth
            .sign_in_with_password("pastor@igreja.org", "senha")
            .await
            .unwrap();
        assert_eq!(signed_in.email.as_deref(), Some("pastor@igreja.org"));
        assert_eq!(session.get().as_deref(), Some(TOKEN));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(signed_in.clone()));

        assert_eq!(auth.current_user().await.unwrap(), Some(signed_in));

        auth.sign_out().await.unwrap();
        assert_eq!(session.get(), None);
        assert_eq!(*rx.borrow(), None);
    }

    #[tokio::test]
    async fn rejected_token_ends_session() {
        let conn = serve().await;
        let session = SessionToken::default();
        session.set(Some("expired".to_string()));
        let auth = RestAuth::new(&conn, session.clone()).unwrap();

        assert_eq!(auth.current_user().await.unwrap(), None);
        assert_eq!(session.get(), None);
    }

    #[tokio::test]
    async fn failed_logout_still_clears_session() {
        let conn = serve().await;
        let session = SessionToken::default();
        session.set(Some("stale".to_string()));
        let auth = RestAuth::new(&conn, session.clone()).unwrap();

        assert!(auth.sign_out().await.is_err());
        assert_eq!(session.get(), None);
        assert_eq!(auth.current_user().await.unwrap(), None);
    }
}
