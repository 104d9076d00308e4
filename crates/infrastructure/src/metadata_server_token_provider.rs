use std::time::{Duration, Instant};

use async_trait::async_trait;
use backupgate_application::AccessTokenProvider;
use backupgate_core::{AccessToken, AppError, AppResult};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

/// Default compute metadata server host.
pub const GOOGLE_METADATA_BASE_URL: &str = "http://metadata.google.internal";

/// OAuth scopes the backup admin calls need.
pub const CLOUD_SQL_ADMIN_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/sqlservice.admin",
];

const TOKEN_PATH: &str = "computeMetadata/v1/instance/service-accounts/default/token";
const REFRESH_LEEWAY: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Token source backed by the compute metadata server of the runtime's service account.
///
/// The token is cached and refreshed once it comes within a minute of expiry.
pub struct MetadataServerTokenProvider {
    http_client: reqwest::Client,
    token_url: Url,
    cached: Mutex<Option<AccessToken>>,
}

impl MetadataServerTokenProvider {
    /// Creates a provider against `base_url`, e.g. [`GOOGLE_METADATA_BASE_URL`].
    pub fn new(http_client: reqwest::Client, base_url: &str) -> AppResult<Self> {
        let mut token_url = Url::parse(base_url)
            .and_then(|base| base.join(TOKEN_PATH))
            .map_err(|error| {
                AppError::Validation(format!("invalid metadata server URL '{base_url}': {error}"))
            })?;
        token_url
            .query_pairs_mut()
            .append_pair("scopes", CLOUD_SQL_ADMIN_SCOPES.join(",").as_str());

        Ok(Self {
            http_client,
            token_url,
            cached: Mutex::new(None),
        })
    }

    async fn fetch_token(&self) -> AppResult<AccessToken> {
        let requested_at = Instant::now();
        let response = self
            .http_client
            .get(self.token_url.clone())
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|error| {
                AppError::Unauthorized(format!("metadata server token request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Unauthorized(format!(
                "metadata server refused token request with status {status}: {}",
                body.trim()
            )));
        }

        let payload: MetadataTokenResponse = response.json().await.map_err(|error| {
            AppError::Unauthorized(format!("metadata server returned an invalid token: {error}"))
        })?;

        info!(
            expires_in_seconds = payload.expires_in,
            "obtained Cloud SQL admin access token"
        );

        Ok(AccessToken::expiring(
            payload.access_token,
            requested_at,
            Duration::from_secs(payload.expires_in),
        ))
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataServerTokenProvider {
    async fn access_token(&self) -> AppResult<AccessToken> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh_at(Instant::now(), REFRESH_LEEWAY)
        {
            return Ok(token.clone());
        }

        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
