use std::env;
use std::fmt::{Debug, Formatter};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use backupgate_application::DEFAULT_LIST_PAGE_SIZE;
use backupgate_core::AppError;
use backupgate_infrastructure::{CLOUDSQL_ADMIN_BASE_URL, GOOGLE_METADATA_BASE_URL};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub enum TokenSourceConfig {
    MetadataServer { base_url: String },
    Static { token: String },
}

impl Debug for TokenSourceConfig {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MetadataServer { base_url } => formatter
                .debug_struct("MetadataServer")
                .field("base_url", base_url)
                .finish(),
            Self::Static { .. } => formatter
                .debug_struct("Static")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackupAdminProviderConfig {
    CloudSql {
        base_url: String,
        timeout: Duration,
        token_source: TokenSourceConfig,
    },
    InMemory,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub list_page_size: u32,
    pub backup_admin: BackupAdminProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_host = optional("API_HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let api_port = optional("API_PORT")
            .map(|value| {
                value
                    .trim()
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))
            })
            .transpose()?
            .unwrap_or(8080);

        let list_page_size = optional("BACKUP_LIST_PAGE_SIZE")
            .map(|value| {
                value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "BACKUP_LIST_PAGE_SIZE must be a positive integer, got '{value}'"
                        ))
                    })
            })
            .transpose()?
            .unwrap_or(DEFAULT_LIST_PAGE_SIZE);

        let backup_admin = match optional("BACKUP_ADMIN_PROVIDER")
            .unwrap_or_else(|| "cloudsql".to_owned())
            .as_str()
        {
            "cloudsql" => {
                let timeout_seconds = optional("BACKUP_ADMIN_TIMEOUT_SECONDS")
                    .map(|value| {
                        value.trim().parse::<u64>().map_err(|error| {
                            AppError::Validation(format!(
                                "invalid BACKUP_ADMIN_TIMEOUT_SECONDS: {error}"
                            ))
                        })
                    })
                    .transpose()?
                    .unwrap_or(30);

                let token_source = match optional("GOOGLE_ACCESS_TOKEN_SOURCE")
                    .unwrap_or_else(|| "metadata".to_owned())
                    .as_str()
                {
                    "metadata" => TokenSourceConfig::MetadataServer {
                        base_url: optional("GOOGLE_METADATA_BASE_URL")
                            .unwrap_or_else(|| GOOGLE_METADATA_BASE_URL.to_owned()),
                    },
                    "static" => TokenSourceConfig::Static {
                        token: optional("GOOGLE_OAUTH_ACCESS_TOKEN").ok_or_else(|| {
                            AppError::Validation(
                                "GOOGLE_OAUTH_ACCESS_TOKEN is required when GOOGLE_ACCESS_TOKEN_SOURCE is 'static'"
                                    .to_owned(),
                            )
                        })?,
                    },
                    other => {
                        return Err(AppError::Validation(format!(
                            "GOOGLE_ACCESS_TOKEN_SOURCE must be either 'metadata' or 'static', got '{other}'"
                        )));
                    }
                };

                BackupAdminProviderConfig::CloudSql {
                    base_url: optional("CLOUDSQL_ADMIN_BASE_URL")
                        .unwrap_or_else(|| CLOUDSQL_ADMIN_BASE_URL.to_owned()),
                    timeout: Duration::from_secs(timeout_seconds.max(1)),
                    token_source,
                }
            }
            "in_memory" => BackupAdminProviderConfig::InMemory,
            other => {
                return Err(AppError::Validation(format!(
                    "BACKUP_ADMIN_PROVIDER must be either 'cloudsql' or 'in_memory', got '{other}'"
                )));
            }
        };

        Ok(Self {
            api_host,
            api_port,
            list_page_size,
            backup_admin,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(values: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let values: HashMap<String, String> = values
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_target_cloud_sql_through_metadata_server() {
        let config = config_from(&[]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.list_page_size, DEFAULT_LIST_PAGE_SIZE);
        assert!(matches!(
            config.backup_admin,
            BackupAdminProviderConfig::CloudSql {
                token_source: TokenSourceConfig::MetadataServer { .. },
                ..
            }
        ));
        assert!(config.socket_address().is_ok());
    }

    #[test]
    fn static_token_source_requires_token() {
        let config = config_from(&[("GOOGLE_ACCESS_TOKEN_SOURCE", "static")]);
        assert!(matches!(config, Err(AppError::Validation(_))));

        let config = config_from(&[
            ("GOOGLE_ACCESS_TOKEN_SOURCE", "static"),
            ("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.local"),
        ]);
        assert!(config.is_ok());
        assert!(!format!("{config:?}").contains("ya29.local"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = config_from(&[("BACKUP_LIST_PAGE_SIZE", "0")]);
        assert!(matches!(config, Err(AppError::Validation(_))));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = config_from(&[("BACKUP_ADMIN_PROVIDER", "firestore")]);
        assert!(matches!(config, Err(AppError::Validation(_))));
    }

    #[test]
    fn in_memory_provider_is_selectable() {
        let config = config_from(&[("BACKUP_ADMIN_PROVIDER", "in_memory"), ("API_PORT", "9000")]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            config.backup_admin,
            BackupAdminProviderConfig::InMemory
        ));
        assert_eq!(config.api_port, 9000);
    }
}
