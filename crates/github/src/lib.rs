pub mod checks;
pub mod webhook;

use anyhow::{Context, Result};
use octocrab::{
    Octocrab,
    models::{InstallationId, InstallationToken},
};
use semgrep_app_core::config::GitHubConfig;

/// GitHub App client. Authenticates as the app itself; per-event API
/// calls go through installation-scoped clients.
#[derive(Clone)]
pub struct GitHubApp {
    pub client: Octocrab,
}

impl GitHubApp {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Octocrab::builder()
            .app(
                config.app_id.into(),
                jsonwebtoken::EncodingKey::from_rsa_pem(config.private_key.as_bytes())?,
            )
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self { client })
    }

    /// Create a client scoped to one installation.
    pub fn installation_client(&self, installation_id: InstallationId) -> Result<Octocrab> {
        self.client
            .installation(installation_id)
            .with_context(|| format!("Failed to create client for installation {installation_id}"))
    }

    /// Exchange an installation ID for a short-lived access token. The
    /// token authenticates the branch clone and is never logged.
    pub async fn create_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<String> {
        let token: InstallationToken = self
            .client
            .post(
                format!("/app/installations/{installation_id}/access_tokens"),
                None::<&()>,
            )
            .await
            .context("Failed to create installation access token")?;
        Ok(token.token)
    }
}
