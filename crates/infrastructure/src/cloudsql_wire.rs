//! Cloud SQL Admin API v1beta4 payload shapes for backup runs.

use backupgate_core::{AppError, AppResult};
use backupgate_domain::{BackupRun, BackupRunId, BackupRunType};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackupRunWire {
    #[serde(default)]
    pub(crate) id: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub(crate) run_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) end_time: Option<String>,
}

impl BackupRunWire {
    pub(crate) fn from_domain(run: &BackupRun) -> Self {
        Self {
            id: Value::String(run.id().as_str().to_owned()),
            run_type: Some(run.run_type().as_str().to_owned()),
            status: run.status().map(ToOwned::to_owned),
            end_time: run
                .end_time()
                .map(|end_time| end_time.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    pub(crate) fn into_domain(self) -> AppResult<BackupRun> {
        let id = match self.id {
            Value::String(value) => value,
            Value::Number(value) => value.to_string(),
            other => {
                return Err(AppError::Upstream {
                    status: StatusCode::BAD_GATEWAY.as_u16(),
                    message: format!("backup run listing contained an invalid id: {other}"),
                });
            }
        };

        let end_time = self.end_time.and_then(|value| {
            DateTime::parse_from_rfc3339(value.as_str())
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|error| {
                    debug!(end_time = %value, error = %error, "ignoring unparseable backup run end time");
                })
                .ok()
        });

        let run_type = self
            .run_type
            .as_deref()
            .unwrap_or_default()
            .parse::<BackupRunType>()
            .unwrap_or_else(|never| match never {});

        Ok(BackupRun::new(
            BackupRunId::new(id)?,
            run_type,
            self.status,
            end_time,
        ))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackupRunListWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) items: Vec<BackupRunWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelopeWire {
    error: ErrorBodyWire,
}

#[derive(Debug, Deserialize)]
struct ErrorBodyWire {
    code: Option<u16>,
    message: Option<String>,
}

/// Maps a non-success admin response to an error, preferring the structured
/// `{"error": {"code", "message"}}` body and falling back to the HTTP status.
pub(crate) fn upstream_error(status: StatusCode, body: &str) -> AppError {
    let structured = serde_json::from_str::<ErrorEnvelopeWire>(body).ok();
    let code = structured
        .as_ref()
        .and_then(|envelope| envelope.error.code)
        .filter(|code| StatusCode::from_u16(*code).is_ok())
        .unwrap_or_else(|| status.as_u16());
    let message = structured
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback_message(status, body));

    AppError::Upstream {
        status: code,
        message,
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("backup admin service request failed")
            .to_owned();
    }

    trimmed.chars().take(512).collect()
}
