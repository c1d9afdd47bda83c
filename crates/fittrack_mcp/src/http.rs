//! REST routes plus the streamable-HTTP MCP endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Days, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use uuid::Uuid;

use fittrack_core::analysis::PeriodAnalysis;
use fittrack_core::export::ExportFormat;
use fittrack_core::inference::{ExerciseEstimate, NutritionEstimate};
use fittrack_core::models::{ExerciseUpdate, MealUpdate, NewExercise, NewMeal};
use fittrack_core::profile::UserProfile;
use fittrack_core::utils::{local_today, parse_day};
use fittrack_core::weight::WeightPoint;
use fittrack_core::{DailyRecord, DailyUpdate, ExerciseEntry, Period, PeriodSummary, WeightEntry};

use crate::FitTrackMcpHandler;
use crate::error::McpError;
use crate::services::{
    DEFAULT_STREAK_WINDOW_DAYS, Export, ExerciseLogged, MealLogged, MealsForDay, StreakReport,
    TrackerService, WeightLogged,
};

pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub service: TrackerService,
    pub metrics: PrometheusHandle,
}

#[derive(Clone, Debug)]
pub struct HttpOptions {
    pub max_body_size: usize,
    pub request_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl HttpOptions {
    /// Reads `MAX_HTTP_BODY_SIZE` (bytes) and `REQUEST_TIMEOUT_SECS`.
    pub fn from_env_with<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            max_body_size: get("MAX_HTTP_BODY_SIZE")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(defaults.max_body_size),
            request_timeout: get("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

type ApiError = (StatusCode, String);

fn map_err(e: McpError) -> ApiError {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!(error = %e, "request failed");
    }
    (status, e.to_string())
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn path_day(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_day(raw).ok_or_else(|| bad_request(format!("invalid date: {raw}")))
}

fn query_day(params: &HashMap<String, String>, key: &str) -> Result<Option<NaiveDate>, ApiError> {
    params.get(key).map(|raw| path_day(raw)).transpose()
}

fn query_period(params: &HashMap<String, String>) -> Result<Period, ApiError> {
    match params.get("period") {
        None => Ok(Period::default()),
        Some(raw) => raw.parse().map_err(bad_request),
    }
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn get_today(State(state): State<Arc<AppState>>) -> Result<Json<DailyRecord>, ApiError> {
    state
        .service
        .get_day(local_today())
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn put_today(
    State(state): State<Arc<AppState>>,
    Json(update): Json<DailyUpdate>,
) -> Result<Json<DailyRecord>, ApiError> {
    state
        .service
        .update_day(local_today(), update)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn get_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = path_day(&date)?;
    state.service.get_day(date).await.map(Json).map_err(map_err)
}

#[debug_handler]
async fn put_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Json(update): Json<DailyUpdate>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = path_day(&date)?;
    state
        .service
        .update_day(date, update)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn get_streak(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StreakReport>, ApiError> {
    let days = match params.get("days") {
        None => DEFAULT_STREAK_WINDOW_DAYS,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| bad_request("days must be a positive integer"))?,
    };
    state
        .service
        .streak_report(days, local_today())
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PeriodSummary>, ApiError> {
    let period = query_period(&params)?;
    state
        .service
        .period_summary(period, local_today())
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn analyze_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PeriodAnalysis>, ApiError> {
    let period = query_period(&params)?;
    state
        .service
        .analyze_period(period, local_today())
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn export_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let period = query_period(&params)?;
    let format = match params.get("format") {
        None => ExportFormat::Json,
        Some(raw) => raw.parse().map_err(bad_request)?,
    };
    let today = local_today();
    let export = state
        .service
        .export(period, format, today)
        .await
        .map_err(map_err)?;

    Ok(match export {
        Export::Json(body) => Json(body).into_response(),
        Export::Csv(text) => {
            let disposition = format!("attachment; filename=\"fitness-{period}-{today}.csv\"");
            (
                [
                    ("content-type", "text/csv; charset=utf-8".to_string()),
                    ("content-disposition", disposition),
                ],
                text,
            )
                .into_response()
        }
    })
}

#[debug_handler]
async fn list_meals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<MealsForDay>, ApiError> {
    let date = query_day(&params, "date")?.unwrap_or_else(local_today);
    state.service.list_meals(date).await.map(Json).map_err(map_err)
}

#[debug_handler]
async fn create_meal(
    State(state): State<Arc<AppState>>,
    Json(meal): Json<NewMeal>,
) -> Result<(StatusCode, Json<MealLogged>), ApiError> {
    let logged = state.service.log_meal(meal).await.map_err(map_err)?;
    Ok((StatusCode::CREATED, Json(logged)))
}

#[debug_handler]
async fn update_meal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<MealUpdate>,
) -> Result<Json<MealLogged>, ApiError> {
    state
        .service
        .update_meal(id, update)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn delete_meal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DailyRecord>, ApiError> {
    state.service.delete_meal(id).await.map(Json).map_err(map_err)
}

#[debug_handler]
async fn list_exercises(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ExerciseEntry>>, ApiError> {
    let (start, end) = match query_day(&params, "date")? {
        Some(day) => (day, day),
        None => {
            let end = query_day(&params, "end_date")?.unwrap_or_else(local_today);
            let start = query_day(&params, "start_date")?
                .unwrap_or_else(|| end.checked_sub_days(Days::new(6)).unwrap_or(end));
            (start, end)
        }
    };
    state
        .service
        .list_exercises(start, end)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn create_exercise(
    State(state): State<Arc<AppState>>,
    Json(exercise): Json<NewExercise>,
) -> Result<(StatusCode, Json<ExerciseLogged>), ApiError> {
    let logged = state.service.log_exercise(exercise).await.map_err(map_err)?;
    Ok((StatusCode::CREATED, Json(logged)))
}

#[debug_handler]
async fn update_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<ExerciseUpdate>,
) -> Result<Json<ExerciseLogged>, ApiError> {
    state
        .service
        .update_exercise(id, update)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn delete_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DailyRecord>, ApiError> {
    state
        .service
        .delete_exercise(id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn weight_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<WeightPoint>>, ApiError> {
    let days = params
        .get("days")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(30);
    state
        .service
        .weight_history(days, local_today())
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn create_weight(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<WeightEntry>,
) -> Result<(StatusCode, Json<WeightLogged>), ApiError> {
    let logged = state.service.log_weight(entry).await.map_err(map_err)?;
    Ok((StatusCode::CREATED, Json(logged)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MealParseRequest {
    #[serde(alias = "description")]
    food_description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseParseRequest {
    #[serde(alias = "description")]
    exercise_description: String,
}

#[debug_handler]
async fn parse_meal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MealParseRequest>,
) -> Result<Json<NutritionEstimate>, ApiError> {
    state
        .service
        .estimate_meal(&req.food_description)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn parse_exercise(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExerciseParseRequest>,
) -> Result<Json<ExerciseEstimate>, ApiError> {
    state
        .service
        .estimate_exercise(&req.exercise_description)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn get_profile(State(state): State<Arc<AppState>>) -> Result<Json<UserProfile>, ApiError> {
    state
        .service
        .get_profile()
        .await
        .map_err(map_err)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "no profile saved".to_string()))
}

#[debug_handler]
async fn put_profile(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .service
        .put_profile(profile)
        .await
        .map(Json)
        .map_err(map_err)
}

/// Full application router. The request timeout covers the REST routes
/// only; MCP sessions on `/mcp` are long-lived streams.
pub fn router(state: Arc<AppState>, options: &HttpOptions) -> Router {
    let handler = FitTrackMcpHandler::new(state.service.clone());
    let factory = move || -> Result<_, std::io::Error> { Ok(handler.clone()) };
    let session = Arc::new(
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default(),
    );
    let mcp_service = rmcp::transport::streamable_http_server::tower::StreamableHttpService::new(
        factory,
        session,
        rmcp::transport::streamable_http_server::tower::StreamableHttpServerConfig::default(),
    );

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/fitness/today", get(get_today).put(put_today))
        .route("/fitness/streak", get(get_streak))
        .route("/fitness/summary", get(get_summary))
        .route("/fitness/summary/analyze", get(analyze_summary))
        .route("/fitness/summary/export", get(export_summary))
        .route("/fitness/{date}", get(get_day).put(put_day))
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/{id}", put(update_meal).delete(delete_meal))
        .route("/exercises", get(list_exercises).post(create_exercise))
        .route("/exercises/{id}", put(update_exercise).delete(delete_exercise))
        .route("/exercises/parse", post(parse_exercise))
        .route("/weight-log", get(weight_history).post(create_weight))
        .route("/diet/parse", post(parse_meal))
        .route("/profile", get(get_profile).put(put_profile))
        .layer(tower_http::timeout::TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            options.request_timeout,
        ))
        .nest_service("/mcp", mcp_service)
        .layer(axum::extract::DefaultBodyLimit::max(options.max_body_size))
        .with_state(state)
}
