// Open Hands - REST API Server
// Read-only API over the savings-group store

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use open_hands::{
    count_reports_for_groups, dashboard_stats, get_cycles_for_groups, get_groups,
    get_reports_for_groups, get_reports_page, monthly_summary, page_window,
    search_groups_by_name, setup_database, total_pages, DashboardStats, MonthlyReport,
    MonthlyReportDocument, MonthlySummary, SavingsGroup, StoreScope,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<Option<()>> {
    fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Scope query parameters shared by the listing endpoints. The most
/// specific one present wins: facilitator, then zone, then country.
#[derive(Deserialize, Default)]
struct ScopeParams {
    facilitator: Option<String>,
    zone: Option<String>,
    country: Option<String>,
}

impl ScopeParams {
    fn scope(&self) -> StoreScope<'_> {
        if let Some(id) = &self.facilitator {
            StoreScope::Facilitator(id)
        } else if let Some(zone) = &self.zone {
            StoreScope::Zone(zone)
        } else if let Some(country) = &self.country {
            StoreScope::Country(country)
        } else {
            StoreScope::All
        }
    }
}

#[derive(Deserialize)]
struct ReportsParams {
    #[serde(default)]
    page: Option<usize>,
    facilitator: Option<String>,
    zone: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize)]
struct SummaryParams {
    year: i32,
    month: u32,
    country: Option<String>,
    director: Option<String>,
}

#[derive(Serialize)]
struct ReportsPage {
    reports: Vec<MonthlyReport>,
    page: usize,
    total_pages: usize,
    total_count: usize,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: Option<MonthlySummary>,
    document: Option<MonthlyReportDocument>,
    filename: String,
}

fn internal_error(e: anyhow::Error) -> axum::response::Response {
    eprintln!("Store error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::fail("internal error")),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/groups - List groups, optionally scoped
async fn list_groups(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_groups(&conn, &params.scope()) {
        Ok(groups) => (StatusCode::OK, Json(ApiResponse::ok(groups))).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/groups/search/:name - Search groups by name fragment
async fn search_groups(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    // Decode URL-encoded name fragment
    let decoded = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();

    match search_groups_by_name(&conn, &decoded) {
        Ok(groups) => (StatusCode::OK, Json(ApiResponse::ok(groups))).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/reports - Paged report listing, newest period first
async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportsParams>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    let scope_params = ScopeParams {
        facilitator: params.facilitator.clone(),
        zone: params.zone.clone(),
        country: params.country.clone(),
    };

    let result = (|| -> anyhow::Result<ReportsPage> {
        let groups = get_groups(&conn, &scope_params.scope())?;
        let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        let total_count = count_reports_for_groups(&conn, &group_ids)?;

        let page = params.page.unwrap_or(1).max(1);
        let reports = get_reports_page(&conn, &group_ids, page_window(page))?;

        Ok(ReportsPage {
            reports,
            page,
            total_pages: total_pages(total_count),
            total_count,
        })
    })();

    match result {
        Ok(page) => (StatusCode::OK, Json(ApiResponse::ok(page))).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/summary?year=&month=&country= - Monthly summary plus export document
async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> impl IntoResponse {
    if !(1..=12).contains(&params.month) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::fail("month must be between 1 and 12")),
        )
            .into_response();
    }

    let conn = state.db.lock().unwrap();

    let result = (|| -> anyhow::Result<SummaryResponse> {
        let scope = match &params.country {
            Some(country) => StoreScope::Country(country),
            None => StoreScope::All,
        };
        let groups = get_groups(&conn, &scope)?;
        let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        let reports = get_reports_for_groups(&conn, &group_ids)?;

        let summary = monthly_summary(&groups, &reports, params.year, params.month);
        let document = summary.as_ref().map(|s| {
            MonthlyReportDocument::build(
                s,
                params.month,
                params.year,
                params.country.as_deref().unwrap_or(""),
                params.director.as_deref().unwrap_or("Dirección Nacional"),
            )
        });

        Ok(SummaryResponse {
            summary,
            document,
            filename: MonthlyReportDocument::filename(params.month, params.year),
        })
    })();

    match result {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::ok(response))).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/dashboard - Program-wide rollups
async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    let result = (|| -> anyhow::Result<DashboardStats> {
        let groups: Vec<SavingsGroup> = get_groups(&conn, &params.scope())?;
        let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        let cycles = get_cycles_for_groups(&conn, &group_ids)?;
        let reports = get_reports_for_groups(&conn, &group_ids)?;
        Ok(dashboard_stats(&groups, &cycles, &reports))
    })();

    match result {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::ok(stats))).into_response(),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("Open Hands - API Server");

    let db_path = std::env::var("OPEN_HANDS_DB").unwrap_or_else(|_| "open_hands.db".to_string());
    let conn = Connection::open(&db_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to initialize schema");
    println!("Database opened: {}", db_path);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/groups", get(list_groups))
        .route("/groups/search/:name", get(search_groups))
        .route("/reports", get(list_reports))
        .route("/summary", get(get_summary))
        .route("/dashboard", get(get_dashboard))
        .with_state(state.clone());

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("Server running on http://localhost:3000");
    println!("  GET /api/groups");
    println!("  GET /api/reports?page=1");
    println!("  GET /api/summary?year=2024&month=3&country=Honduras");
    println!("  GET /api/dashboard");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
