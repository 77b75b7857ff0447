//! Request handlers for the REST endpoints.

use crate::api::Prompt;
use crate::error::{error_type, ErrorType, IntoResult};
use crate::model::{DashboardKpis, OutstandingSummary, SalesmanReport, SettingsLists, SheetInfo};
use crate::parse::ComparisonKind;
use crate::sync::{AuthStatus, Coordinator, SyncReport, SyncStatus};
use crate::{kpi, Error};
use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

type AppState = State<Arc<Coordinator>>;
type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// An error response, rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// A 500 whatever the kind of error.
    fn internal(e: &Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("{e:#}"),
        }
    }

    fn not_authenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            detail: "Not authenticated".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match error_type(&e) {
            ErrorType::Auth => StatusCode::UNAUTHORIZED,
            ErrorType::Request => StatusCode::NOT_FOUND,
            ErrorType::Config | ErrorType::Sheets | ErrorType::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            detail: format!("{e:#}"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self.detail);
        }
        (self.status, Json(ErrorBody { detail: &self.detail })).into_response()
    }
}

fn require_auth(coordinator: &Coordinator) -> std::result::Result<(), ApiError> {
    if coordinator.is_authenticated() {
        Ok(())
    } else {
        Err(ApiError::not_authenticated())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok".to_string(),
        service: "Finance Reports API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/auth/status
pub async fn auth_status(State(coordinator): AppState) -> Json<AuthStatus> {
    Json(coordinator.auth_status().await)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/auth/connect. A failed attempt is reported in the body, not as an HTTP error.
pub async fn auth_connect(State(coordinator): AppState) -> Json<ConnectResponse> {
    let response = match coordinator.authenticate(Prompt::Allowed).await {
        Ok(()) => ConnectResponse {
            success: true,
            message: "Connected to Google Sheets".to_string(),
        },
        Err(e) => {
            warn!("Authentication failed: {e:#}");
            ConnectResponse {
                success: false,
                message: format!("Authentication failed: {e:#}"),
            }
        }
    };
    Json(response)
}

/// POST /api/sync. Any failure, including a missing session, is a 500.
pub async fn sync(State(coordinator): AppState) -> ApiResult<SyncReport> {
    coordinator
        .sync()
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(&e))
}

/// GET /api/sync/status
pub async fn sync_status(State(coordinator): AppState) -> Json<SyncStatus> {
    Json(coordinator.sync_status().await)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SheetsResponse {
    pub sheets: Vec<SheetInfo>,
}

/// GET /api/sheets
pub async fn sheets(State(coordinator): AppState) -> ApiResult<SheetsResponse> {
    require_auth(&coordinator)?;
    let sheets = coordinator.snapshot().await.sheets.clone();
    Ok(Json(SheetsResponse { sheets }))
}

/// GET /api/dashboard
pub async fn dashboard(State(coordinator): AppState) -> ApiResult<DashboardKpis> {
    require_auth(&coordinator)?;
    Ok(Json(coordinator.snapshot().await.dashboard.clone()))
}

/// GET /api/comparison/:kind where `kind` is one of `banks`, `advances`, `suspense` or
/// `outstanding`.
pub async fn comparison(
    State(coordinator): AppState,
    Path(kind): Path<String>,
) -> std::result::Result<Response, ApiError> {
    require_auth(&coordinator)?;
    let snapshot = coordinator.snapshot().await;
    if kind == "outstanding" {
        return Ok(Json(snapshot.outstanding.clone()).into_response());
    }
    let kind: ComparisonKind = kind
        .parse()
        .map_err(|_| anyhow!("Unknown comparison '{kind}'"))
        .pub_result(ErrorType::Request)?;
    let data = match kind {
        ComparisonKind::Banks => &snapshot.banks,
        ComparisonKind::Advances => &snapshot.advances,
        ComparisonKind::Suspense => &snapshot.suspense,
    };
    Ok(Json(data.clone()).into_response())
}

/// GET /api/outstanding/:month, read live from the workbook.
pub async fn monthly_outstanding(
    State(coordinator): AppState,
    Path(month): Path<String>,
) -> ApiResult<OutstandingSummary> {
    require_auth(&coordinator)?;
    Ok(Json(coordinator.monthly_outstanding(&month).await))
}

/// GET /api/settings
pub async fn settings(State(coordinator): AppState) -> ApiResult<SettingsLists> {
    require_auth(&coordinator)?;
    Ok(Json(coordinator.snapshot().await.settings.clone()))
}

/// GET /api/reports/salesman/:name
pub async fn salesman_report(
    State(coordinator): AppState,
    Path(name): Path<String>,
) -> ApiResult<SalesmanReport> {
    require_auth(&coordinator)?;
    let snapshot = coordinator.snapshot().await;
    Ok(Json(kpi::salesman_report(&snapshot.outstanding, &name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{seed_workbook, TestAuthenticator};
    use crate::server::router;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(
        coordinator: &Arc<Coordinator>,
        method: Method,
        uri: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router(coordinator.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get(coordinator: &Arc<Coordinator>, uri: &str) -> (StatusCode, Value) {
        send(coordinator, Method::GET, uri).await
    }

    fn coordinator() -> Arc<Coordinator> {
        Arc::new(Coordinator::new(Box::new(TestAuthenticator::default())))
    }

    async fn synced() -> Arc<Coordinator> {
        let c = coordinator();
        c.sync().await.unwrap();
        c
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = get(&coordinator(), "/").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("ok", body["status"]);
        assert_eq!("Finance Reports API", body["service"]);
        assert_eq!(env!("CARGO_PKG_VERSION"), body["version"]);
    }

    #[tokio::test]
    async fn test_data_endpoints_require_auth() {
        let c = coordinator();
        for uri in [
            "/api/sheets",
            "/api/dashboard",
            "/api/comparison/banks",
            "/api/comparison/outstanding",
            "/api/settings",
            "/api/outstanding/JAN-2024",
            "/api/reports/salesman/Ali",
        ] {
            let (status, body) = get(&c, uri).await;
            assert_eq!(StatusCode::UNAUTHORIZED, status, "{uri}");
            assert_eq!("Not authenticated", body["detail"], "{uri}");
        }
    }

    #[tokio::test]
    async fn test_auth_status_and_connect() {
        let c = coordinator();
        let (_, body) = get(&c, "/api/auth/status").await;
        assert_eq!(false, body["authenticated"]);
        assert_eq!("Authentication required", body["message"]);

        let (status, body) = send(&c, Method::POST, "/api/auth/connect").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(true, body["success"]);
        assert_eq!("Connected to Google Sheets", body["message"]);

        let (_, body) = get(&c, "/api/auth/status").await;
        assert_eq!(true, body["authenticated"]);
        assert_eq!("Ready", body["message"]);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported_in_body() {
        let c = Arc::new(Coordinator::new(Box::new(TestAuthenticator::rejecting())));
        let (status, body) = send(&c, Method::POST, "/api/auth/connect").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(false, body["success"]);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Authentication failed"));
    }

    #[tokio::test]
    async fn test_sync_endpoint() {
        let c = coordinator();
        let (status, body) = send(&c, Method::POST, "/api/sync").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(true, body["success"]);
        assert_eq!("Data synchronized successfully", body["message"]);
        assert_eq!(8, body["sheets_loaded"]);
        assert!(body.get("warnings").is_none());

        let (_, status_body) = get(&c, "/api/sync/status").await;
        assert_eq!(true, status_body["authenticated"]);
        assert_eq!(body["last_sync"], status_body["last_sync"]);
    }

    #[tokio::test]
    async fn test_sync_auth_failure_is_500() {
        let c = Arc::new(Coordinator::new(Box::new(TestAuthenticator::rejecting())));
        let (status, body) = send(&c, Method::POST, "/api/sync").await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("Authentication failed"));

        let (_, status_body) = get(&c, "/api/sync/status").await;
        assert_eq!(Value::Null, status_body["last_sync"]);
    }

    #[tokio::test]
    async fn test_sync_reports_warnings() {
        let mut data = seed_workbook();
        data.remove("Settings");
        let c = Arc::new(Coordinator::new(Box::new(TestAuthenticator::new(data))));
        let (status, body) = send(&c, Method::POST, "/api/sync").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(1, body["warnings"].as_array().unwrap().len());

        let (_, settings) = get(&c, "/api/settings").await;
        assert_eq!(0, settings["banks"].as_array().unwrap().len());
    }

    #[tokio::test]
    async fn test_dashboard_before_first_sync() {
        let c = coordinator();
        let (status, _) = send(&c, Method::POST, "/api/auth/connect").await;
        assert_eq!(StatusCode::OK, status);

        let (status, body) = get(&c, "/api/dashboard").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("N/A", body["latest_month"]);
        assert_eq!(0, body["months_tracked"]);
        assert_eq!(0.0, body["bank_balance"]);
    }

    #[tokio::test]
    async fn test_dashboard_and_sheets() {
        let c = synced().await;
        let (status, body) = get(&c, "/api/dashboard").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("MAR-2024", body["latest_month"]);
        assert_eq!(155_000.0, body["bank_balance"]);

        let (_, body) = get(&c, "/api/sheets").await;
        let sheets = body["sheets"].as_array().unwrap();
        assert_eq!(8, sheets.len());
        let jan = sheets
            .iter()
            .find(|s| s["name"] == "Banks_JAN-2024")
            .unwrap();
        assert_eq!("banks", jan["sheet_type"]);
        assert_eq!("JAN-2024", jan["month"]);
    }

    #[tokio::test]
    async fn test_comparisons() {
        let c = synced().await;
        let (status, banks) = get(&c, "/api/comparison/banks").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(3, banks["months"].as_array().unwrap().len());

        let (status, outstanding) = get(&c, "/api/comparison/outstanding").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(3, outstanding["salesmen"].as_object().unwrap().len());

        let (status, _) = get(&c, "/api/comparison/advances").await;
        assert_eq!(StatusCode::OK, status);
        let (status, _) = get(&c, "/api/comparison/suspense").await;
        assert_eq!(StatusCode::OK, status);
    }

    #[tokio::test]
    async fn test_unknown_comparison_is_404() {
        let c = synced().await;
        let (status, body) = get(&c, "/api/comparison/loans").await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert!(body["detail"].as_str().unwrap().contains("loans"));
    }

    #[tokio::test]
    async fn test_monthly_outstanding() {
        let c = synced().await;
        let (status, body) = get(&c, "/api/outstanding/JAN-2024").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("JAN-2024", body["month"]);
        assert_eq!(4, body["entries"].as_array().unwrap().len());
        assert_eq!(100_000.0, body["total_outstanding"]);
    }

    #[tokio::test]
    async fn test_salesman_report() {
        let c = synced().await;
        let (status, body) = get(&c, "/api/reports/salesman/Ali").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("Ali", body["salesman"]);
        assert_eq!(3, body["values"].as_array().unwrap().len());

        let (status, body) = get(&c, "/api/reports/salesman/Nobody").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(0, body["values"].as_array().unwrap().len());
        assert_eq!(0.0, body["total"]);
        assert_eq!("down", body["trend"]);
    }

    #[test]
    fn test_error_status_mapping() {
        let e: Error = Err::<(), _>(anyhow!("no token"))
            .pub_result(ErrorType::Auth)
            .unwrap_err();
        assert_eq!(StatusCode::UNAUTHORIZED, ApiError::from(e).status());

        let e = anyhow!("boom");
        let api = ApiError::from(e);
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, api.status());
        assert_eq!("boom", api.detail());
    }
}
