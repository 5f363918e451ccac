//! Session/auth client.
//!
//! Authentication is owned by the hosted backend; this module only mirrors
//! its session state. Consumers subscribe to a watch channel carrying
//! `{user, is_loading}` — the same shape the backend's SDK callback exposes —
//! and `login`/`logout` are opaque calls against the auth endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::StoreConfig;
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Snapshot of the session, as published to subscribers.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_loading: bool,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// The signed-in user behind the configured credentials.
    async fn me(&self) -> Result<User, StoreError>;

    /// Establish a session. Opaque to us; the backend decides what it means.
    async fn login(&self) -> Result<User, StoreError>;

    /// Tear the session down.
    async fn logout(&self) -> Result<(), StoreError>;
}

/// Auth client for the hosted backend.
pub struct HttpAuth {
    client: Client,
    endpoint: url::Url,
    api_token: Option<SecretString>,
}

impl HttpAuth {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn auth_url(&self, leaf: &str) -> Result<url::Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .push("v1")
            .push("auth")
            .push(leaf);
        Ok(url)
    }

    fn bearer(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, StoreError> {
        let token = self
            .api_token
            .as_ref()
            .ok_or_else(|| StoreError::Auth("no API token configured".into()))?;
        Ok(builder.bearer_auth(token.expose_secret()))
    }

    async fn expect_user(response: reqwest::Response) -> Result<User, StoreError> {
        match response.status() {
            status if status.is_success() => response
                .json::<User>()
                .await
                .map_err(|e| StoreError::Serialization(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Auth(
                "store rejected credentials".to_string(),
            )),
            status => Err(StoreError::Unavailable(status.to_string())),
        }
    }
}

#[async_trait]
impl AuthService for HttpAuth {
    async fn me(&self) -> Result<User, StoreError> {
        let request = self.bearer(self.client.get(self.auth_url("me")?))?;
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::expect_user(response).await
    }

    async fn login(&self) -> Result<User, StoreError> {
        let request = self.bearer(self.client.post(self.auth_url("sessions")?))?;
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::expect_user(response).await
    }

    async fn logout(&self) -> Result<(), StoreError> {
        let request = self.bearer(self.client.delete(self.auth_url("sessions")?))?;
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(response.status().to_string()))
        }
    }
}

/// Fixed demo identity for `--offline` runs and tests.
pub struct StaticAuth {
    user: User,
}

impl StaticAuth {
    pub fn demo() -> Self {
        Self {
            user: User {
                id: "demo-user".to_string(),
                email: "demo@pipeboard.dev".to_string(),
                display_name: Some("Demo User".to_string()),
                created_at: None,
            },
        }
    }
}

#[async_trait]
impl AuthService for StaticAuth {
    async fn me(&self) -> Result<User, StoreError> {
        Ok(self.user.clone())
    }

    async fn login(&self) -> Result<User, StoreError> {
        Ok(self.user.clone())
    }

    async fn logout(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Owns the session state channel and drives it from an [`AuthService`].
pub struct AuthHandle {
    service: Arc<dyn AuthService>,
    state: watch::Sender<AuthState>,
}

impl AuthHandle {
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        let (state, _) = watch::channel(AuthState {
            user: None,
            is_loading: true,
        });
        Self { service, state }
    }

    /// Subscribe to session snapshots. The current value is delivered
    /// immediately.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Resolve the signed-in user and publish the settled state.
    pub async fn resolve(&self) -> Result<User, StoreError> {
        self.state.send_replace(AuthState {
            user: None,
            is_loading: true,
        });
        match self.service.me().await {
            Ok(user) => {
                self.state.send_replace(AuthState {
                    user: Some(user.clone()),
                    is_loading: false,
                });
                Ok(user)
            }
            Err(e) => {
                self.state.send_replace(AuthState {
                    user: None,
                    is_loading: false,
                });
                Err(e)
            }
        }
    }

    pub async fn login(&self) -> Result<User, StoreError> {
        let user = self.service.login().await?;
        self.state.send_replace(AuthState {
            user: Some(user.clone()),
            is_loading: false,
        });
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), StoreError> {
        self.service.logout().await?;
        self.state.send_replace(AuthState {
            user: None,
            is_loading: false,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_sees_loading_then_settled_user() {
        let handle = AuthHandle::new(Arc::new(StaticAuth::demo()));
        let rx = handle.subscribe();
        assert!(rx.borrow().is_loading);
        assert!(rx.borrow().user.is_none());

        let user = handle.resolve().await.expect("resolve");
        assert_eq!(user.id, "demo-user");
        let settled = rx.borrow();
        assert!(!settled.is_loading);
        assert_eq!(settled.user.as_ref().expect("user").id, "demo-user");
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let handle = AuthHandle::new(Arc::new(StaticAuth::demo()));
        handle.resolve().await.expect("resolve");
        handle.logout().await.expect("logout");
        assert!(handle.subscribe().borrow().user.is_none());
    }
}
