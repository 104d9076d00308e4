use backupgate_core::{AppError, AppResult};
use backupgate_domain::{DeletionResult, RetentionPolicy};
use serde::Serialize;

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Uniform success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    pub fn new(status: u16, message: impl Into<String>, result: Option<T>) -> Self {
        Self {
            status,
            message: message.into(),
            result,
        }
    }
}

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

pub const INVALID_RETENTION_MESSAGE: &str =
    "error: retain_count and retain_days must be non-negative integers";

/// Retention query parameters of a prune request.
///
/// Values are kept as text so that malformed input yields the API's own
/// validation message instead of an extractor rejection.
#[derive(Debug, Default)]
pub struct RetentionQueryRequest {
    pub retain_count: Option<String>,
    pub retain_days: Option<String>,
}

impl RetentionQueryRequest {
    /// Picks the retention parameters out of decoded query pairs.
    ///
    /// A repeated key keeps its first value. Unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut request = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "retain_count" => &mut request.retain_count,
                "retain_days" => &mut request.retain_days,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        request
    }

    /// Returns `None` when no rule was requested.
    pub fn into_policy(self) -> AppResult<Option<RetentionPolicy>> {
        let count = parse_limit(self.retain_count.as_deref())?;
        let days = parse_limit(self.retain_days.as_deref())?;

        if count.is_none() && days.is_none() {
            return Ok(None);
        }

        Ok(Some(RetentionPolicy::new(count, days)))
    }
}

fn parse_limit(value: Option<&str>) -> AppResult<Option<u32>> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    let parsed = value
        .parse::<i64>()
        .ok()
        .filter(|limit| *limit >= 0)
        .ok_or_else(|| AppError::Validation(INVALID_RETENTION_MESSAGE.to_owned()))?;

    Ok(Some(u32::try_from(parsed).unwrap_or(u32::MAX)))
}

#[derive(Debug, Serialize)]
pub struct RetentionResponse {
    pub days: i64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DeletedBackupsResponse {
    pub total: usize,
    pub backups: Vec<String>,
}

/// Wire shape of a prune outcome.
#[derive(Debug, Serialize)]
pub struct DeletionResultResponse {
    pub retention: RetentionResponse,
    pub deleted: DeletedBackupsResponse,
}

impl From<DeletionResult> for DeletionResultResponse {
    fn from(value: DeletionResult) -> Self {
        let policy = value.policy();
        Self {
            retention: RetentionResponse {
                days: policy.days_or_disabled(),
                count: policy.count_or_disabled(),
            },
            deleted: DeletedBackupsResponse {
                total: value.total(),
                backups: value
                    .deleted()
                    .iter()
                    .map(|backup_run_id| backup_run_id.as_str().to_owned())
                    .collect(),
            },
        }
    }
}
