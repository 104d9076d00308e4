use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use backupgate_application::BackupService;
use backupgate_domain::{BackupRun, BackupRunId, BackupRunType, InstanceRef};
use backupgate_infrastructure::{BackupAdminCall, InMemoryBackupAdmin};
use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::middleware::REQUEST_ID_HEADER;
use crate::state::AppState;

const BACKUPS_URI: &str = "/projects/acme-prod/instances/orders-db/backups";

fn instance() -> InstanceRef {
    InstanceRef::new("acme-prod", "orders-db").unwrap_or_else(|_| unreachable!())
}

fn run(id: &str, run_type: BackupRunType, age_days: i64) -> BackupRun {
    BackupRun::new(
        BackupRunId::new(id).unwrap_or_else(|_| unreachable!()),
        run_type,
        Some("SUCCESSFUL".to_owned()),
        Some(Utc::now() - TimeDelta::days(age_days)),
    )
}

fn app(admin: &Arc<InMemoryBackupAdmin>) -> Router {
    build_router(AppState {
        backup_service: BackupService::new(admin.clone(), 2),
    })
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_else(|_| unreachable!());

    let response = app
        .oneshot(request)
        .await
        .unwrap_or_else(|error| match error {});

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, headers, body)
}

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    let (status, headers, body) = send(app(&admin), Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    assert!(headers.contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn latest_without_backups_is_not_found_envelope() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    let (status, _, body) = send(
        app(&admin),
        Method::GET,
        &format!("{BACKUPS_URI}/latest"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"status": 404, "message": "no on-demand backups exist", "result": null})
    );
}

#[tokio::test]
async fn latest_resolves_to_newest_run_of_any_type() {
    let admin = Arc::new(InMemoryBackupAdmin::new());
    admin
        .seed(
            &instance(),
            vec![
                run("30", BackupRunType::Automated, 0),
                run("20", BackupRunType::OnDemand, 1),
            ],
        )
        .await;

    let (status, _, body) = send(
        app(&admin),
        Method::GET,
        &format!("{BACKUPS_URI}/LATEST"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!(200));
    assert_eq!(body["message"], json!("success"));
    assert_eq!(body["result"]["id"], json!("30"));
    assert_eq!(body["result"]["type"], json!("AUTOMATED"));
}

#[tokio::test]
async fn unknown_backup_propagates_upstream_error() {
    let admin = Arc::new(InMemoryBackupAdmin::new());
    admin
        .seed(&instance(), vec![run("20", BackupRunType::OnDemand, 1)])
        .await;

    let (status, _, body) = send(app(&admin), Method::GET, &format!("{BACKUPS_URI}/99")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"error": {"code": 404, "message": "The backup run does not exist."}})
    );
}

#[tokio::test]
async fn post_starts_on_demand_backup() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    let (status, _, body) = send(app(&admin), Method::POST, BACKUPS_URI).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!(200));
    assert_eq!(body["message"], json!("backup started successfully"));
    assert_eq!(body["result"]["operationType"], json!("BACKUP_VOLUME"));
    assert_eq!(admin.runs(&instance()).await.len(), 1);
}

#[tokio::test]
async fn delete_without_criteria_makes_no_admin_call() {
    let admin = Arc::new(InMemoryBackupAdmin::new());
    admin
        .seed(&instance(), vec![run("20", BackupRunType::OnDemand, 100)])
        .await;

    let (status, _, body) = send(
        app(&admin),
        Method::DELETE,
        &format!("{BACKUPS_URI}?retain_count=&retain_days="),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": 200,
            "message": "nothing to be deleted. use query parameters retain_count and/or retain_days to specify retention criteria",
            "result": null
        })
    );
    assert!(admin.calls().await.is_empty());
}

#[tokio::test]
async fn delete_without_query_string_makes_no_admin_call() {
    let admin = Arc::new(InMemoryBackupAdmin::new());
    admin
        .seed(&instance(), vec![run("20", BackupRunType::OnDemand, 100)])
        .await;

    let (status, _, body) = send(app(&admin), Method::DELETE, BACKUPS_URI).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!(200));
    assert_eq!(body["result"], Value::Null);
    assert!(admin.calls().await.is_empty());
    assert_eq!(admin.runs(&instance()).await.len(), 1);
}

#[tokio::test]
async fn delete_with_repeated_key_uses_first_value() {
    let admin = Arc::new(InMemoryBackupAdmin::new());
    admin
        .seed(
            &instance(),
            vec![
                run("3", BackupRunType::OnDemand, 0),
                run("2", BackupRunType::OnDemand, 1),
                run("1", BackupRunType::OnDemand, 2),
            ],
        )
        .await;

    let (status, _, body) = send(
        app(&admin),
        Method::DELETE,
        &format!("{BACKUPS_URI}?retain_count=1&retain_count=2"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"],
        json!({
            "retention": {"days": -1, "count": 1},
            "deleted": {"total": 2, "backups": ["2", "1"]}
        })
    );
}

#[tokio::test]
async fn delete_with_repeated_invalid_key_is_json_error() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    let (status, _, body) = send(
        app(&admin),
        Method::DELETE,
        &format!("{BACKUPS_URI}?retain_days=-3&retain_days=4"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!(400));
    assert!(admin.calls().await.is_empty());
}

#[tokio::test]
async fn delete_with_negative_count_is_rejected() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    for query in ["retain_count=-1", "retain_days=abc", "retain_count=2&retain_days=1.5"] {
        let (status, _, body) = send(
            app(&admin),
            Method::DELETE,
            &format!("{BACKUPS_URI}?{query}"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": {
                    "code": 400,
                    "message": "error: retain_count and retain_days must be non-negative integers"
                }
            })
        );
    }
    assert!(admin.calls().await.is_empty());
}

#[tokio::test]
async fn delete_prunes_union_of_count_and_age_rules() {
    let admin = Arc::new(InMemoryBackupAdmin::new());
    admin
        .seed(
            &instance(),
            vec![
                run("5", BackupRunType::OnDemand, 0),
                run("4", BackupRunType::OnDemand, 2),
                run("auto", BackupRunType::Automated, 5),
                run("3", BackupRunType::OnDemand, 10),
                run("2", BackupRunType::OnDemand, 20),
                run("1", BackupRunType::OnDemand, 40),
            ],
        )
        .await;

    let (status, _, body) = send(
        app(&admin),
        Method::DELETE,
        &format!("{BACKUPS_URI}?retain_count=2&retain_days=15"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": 200,
            "message": "on-demand backups deleted successfully",
            "result": {
                "retention": {"days": 15, "count": 2},
                "deleted": {"total": 3, "backups": ["3", "2", "1"]}
            }
        })
    );

    let remaining: Vec<String> = admin
        .runs(&instance())
        .await
        .iter()
        .map(|run| run.id().as_str().to_owned())
        .collect();
    assert_eq!(remaining, vec!["5", "4", "auto"]);

    let list_calls = admin
        .calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, BackupAdminCall::List(_)))
        .count();
    assert_eq!(list_calls, 3);
}

#[tokio::test]
async fn delete_on_empty_instance_selects_nothing() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    let (status, _, body) = send(
        app(&admin),
        Method::DELETE,
        &format!("{BACKUPS_URI}?retain_count=1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"],
        json!({
            "retention": {"days": -1, "count": 1},
            "deleted": {"total": 0, "backups": []}
        })
    );
}

#[tokio::test]
async fn unsupported_methods_are_refused() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    let (status, _, body) = send(app(&admin), Method::PUT, BACKUPS_URI).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body,
        json!({
            "error": {
                "code": 405,
                "message": "received PUT method in HTTP request. Only POST, GET and DELETE are allowed."
            }
        })
    );

    let (status, _, _) = send(app(&admin), Method::PATCH, "/elsewhere").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unmatched_paths_are_not_found() {
    let admin = Arc::new(InMemoryBackupAdmin::new());

    let (status, _, body) = send(app(&admin), Method::GET, "/projects/acme-prod").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"error": {"code": 404, "message": "resource not found: /projects/acme-prod"}})
    );

    let (status, _, body) = send(app(&admin), Method::GET, BACKUPS_URI).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"]["message"],
        json!(format!("resource not found: {BACKUPS_URI}"))
    );
}
