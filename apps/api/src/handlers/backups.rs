use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backupgate_application::{AdminResponse, BackupStatusLookup};
use backupgate_domain::InstanceRef;
use serde::Deserialize;
use serde_json::Value;

use crate::dto::{DeletionResultResponse, Envelope, RetentionQueryRequest};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const STATUS_SUCCESS_MESSAGE: &str = "success";
pub const NO_BACKUPS_MESSAGE: &str = "no on-demand backups exist";
pub const BACKUP_STARTED_MESSAGE: &str = "backup started successfully";
pub const BACKUPS_DELETED_MESSAGE: &str = "on-demand backups deleted successfully";
pub const NOTHING_TO_DELETE_MESSAGE: &str = "nothing to be deleted. use query parameters retain_count and/or retain_days to specify retention criteria";

#[derive(Debug, Deserialize)]
pub struct InstancePath {
    project_id: String,
    instance_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BackupPath {
    project_id: String,
    instance_id: String,
    backup_id: String,
}

fn instance_ref(project_id: String, instance_id: String) -> Result<InstanceRef, ApiError> {
    InstanceRef::new(project_id, instance_id).map_err(ApiError::from)
}

fn envelope_response<T: serde::Serialize>(
    status: u16,
    message: &str,
    result: Option<T>,
) -> Response {
    let http_status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    (http_status, Json(Envelope::new(status, message, result))).into_response()
}

fn admin_envelope(response: AdminResponse<Value>, message: &str) -> Response {
    envelope_response(response.status, message, Some(response.body))
}

pub async fn get_backup_status_handler(
    State(state): State<AppState>,
    Path(path): Path<BackupPath>,
) -> ApiResult<Response> {
    let instance = instance_ref(path.project_id, path.instance_id)?;

    let lookup = state
        .backup_service
        .get_backup_status(&instance, &path.backup_id)
        .await?;

    Ok(match lookup {
        BackupStatusLookup::Found(response) => admin_envelope(response, STATUS_SUCCESS_MESSAGE),
        BackupStatusLookup::NoBackups => envelope_response::<Value>(
            StatusCode::NOT_FOUND.as_u16(),
            NO_BACKUPS_MESSAGE,
            None,
        ),
    })
}

pub async fn create_backup_handler(
    State(state): State<AppState>,
    Path(path): Path<InstancePath>,
) -> ApiResult<Response> {
    let instance = instance_ref(path.project_id, path.instance_id)?;

    let response = state
        .backup_service
        .start_on_demand_backup(&instance)
        .await?;

    Ok(admin_envelope(response, BACKUP_STARTED_MESSAGE))
}

pub async fn prune_backups_handler(
    State(state): State<AppState>,
    Path(path): Path<InstancePath>,
    Query(query): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let instance = instance_ref(path.project_id, path.instance_id)?;

    let Some(policy) = RetentionQueryRequest::from_pairs(query).into_policy()? else {
        return Ok(envelope_response::<Value>(
            StatusCode::OK.as_u16(),
            NOTHING_TO_DELETE_MESSAGE,
            None,
        ));
    };

    let result = state
        .backup_service
        .prune_on_demand_backups(&instance, policy)
        .await?;

    Ok(envelope_response(
        StatusCode::OK.as_u16(),
        BACKUPS_DELETED_MESSAGE,
        Some(DeletionResultResponse::from(result)),
    ))
}
