use crate::common::{DeepGuardError, Result};
use crate::core::page::Page;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub email: String,
    /// When the identity was stored, RFC 3339.
    #[serde(default)]
    pub signed_in_at: Option<String>,
}

impl AuthenticatedIdentity {
    pub fn label(&self) -> &str {
        &self.email
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means nobody is signed in.
    async fn current_identity(&self) -> Result<Option<AuthenticatedIdentity>>;

    async fn sign_out(&self) -> Result<()>;
}

/// Identity persisted as a small JSON file by `deepguard sign-in`.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn sign_in(&self, email: &str) -> Result<AuthenticatedIdentity> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DeepGuardError::AuthResolution(format!("'{}' is not an email address", email)));
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let identity = AuthenticatedIdentity {
            email: email.to_string(),
            signed_in_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&identity)?)?;
        tracing::info!("Signed in as {}", identity.email);
        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for FileIdentityStore {
    async fn current_identity(&self) -> Result<Option<AuthenticatedIdentity>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = tokio::fs::read(&self.path).await?;
        let identity: AuthenticatedIdentity = serde_json::from_slice(&data)
            .map_err(|e| DeepGuardError::AuthResolution(format!(
                "corrupt identity file {}: {}", self.path.display(), e
            )))?;
        Ok(Some(identity))
    }

    async fn sign_out(&self) -> Result<()> {
        if self.path.exists() {
            tokio::fs::remove_file(&self.path).await?;
        }
        tracing::info!("Signed out");
        Ok(())
    }
}

/// Resolves who is signed in before any verification starts.
pub struct AuthGate {
    provider: Box<dyn IdentityProvider>,
    login_url: String,
}

impl AuthGate {
    pub fn new(provider: Box<dyn IdentityProvider>, login_url: impl Into<String>) -> Self {
        Self {
            provider,
            login_url: login_url.into(),
        }
    }

    /// On success the sign-out control is revealed with the identity's label.
    /// Otherwise the page is redirected to the login destination.
    pub async fn resolve(&self, page: &dyn Page) -> Result<AuthenticatedIdentity> {
        let outcome = match self.provider.current_identity().await {
            Ok(Some(identity)) => Ok(identity),
            Ok(None) => Err(DeepGuardError::AuthResolution("not signed in".into())),
            Err(DeepGuardError::AuthResolution(msg)) => Err(DeepGuardError::AuthResolution(msg)),
            Err(e) => Err(DeepGuardError::AuthResolution(e.to_string())),
        };

        match outcome {
            Ok(identity) => {
                page.show_sign_out(identity.label());
                tracing::info!("Authenticated as {}", identity.label());
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!("Auth gate rejected visitor: {}", e);
                page.redirect(&self.login_url);
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self, page: &dyn Page) -> Result<()> {
        self.provider.sign_out().await?;
        page.hide_sign_out();
        page.redirect(&self.login_url);
        Ok(())
    }
}
