//! Authenticated session: bearer token plus the profile of the signed-in
//! account, persisted through a pluggable [`SessionStore`].

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    domain::Role,
    protocol::{LoginRequest, SessionUser},
};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, warn};

use crate::{
    api::ApiClient,
    error::{ClientError, ClientResult},
};

pub const ACCESS_DENIED_MESSAGE: &str =
    "Acesso negado. Apenas SUPER_ADMIN pode acessar esta área.";
pub const LOGIN_FAILED_MESSAGE: &str = "Erro ao realizar login. Verifique suas credenciais.";

/// Source of the bearer token attached to outgoing requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn current_token(&self) -> Option<String>;
    /// Called by the transport when the backend answers `401`.
    async fn session_expired(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    #[serde(rename = "usuario")]
    pub user: SessionUser,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredSession>>;
    async fn save(&self, session: &StoredSession) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        *self.slot.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.slot.lock().await.take();
        Ok(())
    }
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<StoredSession>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt session record in {}", self.path.display()))?;
        Ok(Some(session))
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create session directory {}", parent.display())
            })?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    SignedOut,
    Active,
    /// Torn down after the backend rejected the token.
    Expired,
}

pub struct AuthSession {
    current: RwLock<Option<StoredSession>>,
    store: Arc<dyn SessionStore>,
    status: watch::Sender<SessionStatus>,
}

impl AuthSession {
    pub fn new(store: Arc<dyn SessionStore>) -> Arc<Self> {
        let (status, _) = watch::channel(SessionStatus::SignedOut);
        Arc::new(Self {
            current: RwLock::new(None),
            store,
            status,
        })
    }

    pub fn in_memory() -> Arc<Self> {
        Self::new(Arc::new(MemorySessionStore::default()))
    }

    /// Loads a previously persisted session. A record that cannot be decoded
    /// is discarded.
    pub async fn restore(&self) -> Option<SessionUser> {
        match self.store.load().await {
            Ok(Some(session)) => {
                let user = session.user.clone();
                *self.current.write().await = Some(session);
                self.status.send_replace(SessionStatus::Active);
                Some(user)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("session: discarding unreadable session record: {err:#}");
                if let Err(err) = self.store.clear().await {
                    warn!("session: failed to clear session record: {err:#}");
                }
                None
            }
        }
    }

    /// Signs in against the backend. Only `SUPER_ADMIN` accounts are
    /// accepted; any other role leaves the session untouched.
    pub async fn login(
        &self,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> ClientResult<SessionUser> {
        let response = api
            .login(&LoginRequest::super_admin(email, password))
            .await?;

        if response.user.role != Role::SuperAdmin {
            warn!(
                "session: rejected login for {} with role {}",
                response.user.email, response.user.role
            );
            return Err(ClientError::AccessDenied(ACCESS_DENIED_MESSAGE.to_string()));
        }

        let user = response.user.clone();
        self.establish(StoredSession {
            token: response.token,
            user: response.user,
        })
        .await?;
        info!("session: signed in as {}", user.email);
        Ok(user)
    }

    pub async fn establish(&self, session: StoredSession) -> ClientResult<()> {
        self.store
            .save(&session)
            .await
            .map_err(|err| ClientError::SessionStore(format!("{err:#}")))?;
        *self.current.write().await = Some(session);
        self.status.send_replace(SessionStatus::Active);
        Ok(())
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.discard(SessionStatus::SignedOut).await
    }

    pub async fn user(&self) -> Option<SessionUser> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn is_super_admin(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.user.role == Role::SuperAdmin)
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    async fn discard(&self, status: SessionStatus) -> ClientResult<()> {
        self.current.write().await.take();
        self.status.send_replace(status);
        self.store
            .clear()
            .await
            .map_err(|err| ClientError::SessionStore(format!("{err:#}")))
    }
}

#[async_trait]
impl TokenProvider for AuthSession {
    async fn current_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
    }

    async fn session_expired(&self) {
        warn!("session: backend rejected the bearer token, signing out");
        if let Err(err) = self.discard(SessionStatus::Expired).await {
            warn!("session: {err}");
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
