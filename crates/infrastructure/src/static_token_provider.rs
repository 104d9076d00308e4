use async_trait::async_trait;
use backupgate_application::AccessTokenProvider;
use backupgate_core::{AccessToken, AppError, AppResult};

/// Token source returning one pre-issued token, for local runs.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Wraps a pre-issued bearer token.
    pub fn new(token: impl Into<String>) -> AppResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AppError::Validation(
                "static access token must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            token: AccessToken::new(token.trim()),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> AppResult<AccessToken> {
        Ok(self.token.clone())
    }
}
