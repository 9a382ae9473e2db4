use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::admission::{AdmissionController, AdmissionError, RegistrationRequest};
use super::domain::{Grade, RegistrationId, UserId};
use super::repository::{FestivalRepository, Notifier};
use super::results::{ResultError, ResultService};
use super::scoring::ScoringService;

/// Services shared by every festival route.
pub struct FestivalState<R, N> {
    pub admission: Arc<AdmissionController<R, N>>,
    pub results: Arc<ResultService<R>>,
    pub scoring: Arc<ScoringService<R>>,
}

impl<R, N> Clone for FestivalState<R, N> {
    fn clone(&self) -> Self {
        Self {
            admission: Arc::clone(&self.admission),
            results: Arc::clone(&self.results),
            scoring: Arc::clone(&self.scoring),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    pub(crate) items: Vec<RegistrationRequest>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GradeRequest {
    #[serde(default)]
    pub(crate) grade: Option<Grade>,
}

/// Router builder exposing admission, grading and leaderboard endpoints.
pub fn festival_router<R, N>(state: FestivalState<R, N>) -> Router
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/users/:user_id/registrations",
            post(register_handler::<R, N>),
        )
        .route(
            "/api/v1/users/:user_id/registrations/batch",
            post(batch_handler::<R, N>),
        )
        .route("/api/v1/users/:user_id/quota", get(quota_handler::<R, N>))
        .route(
            "/api/v1/registrations/:registration_id/grade",
            put(grade_handler::<R, N>),
        )
        .route(
            "/api/v1/registrations/:registration_id/cancel",
            post(cancel_handler::<R, N>),
        )
        .route("/api/v1/leaderboard", get(leaderboard_handler::<R, N>))
        .with_state(state)
}

fn error_body(status: StatusCode, code: &str, detail: Value) -> Response {
    (status, Json(json!({ "error": code, "detail": detail }))).into_response()
}

fn admission_status(error: &AdmissionError) -> StatusCode {
    match error.code() {
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "ALREADY_REGISTERED" | "DUPLICATE_CONSTRAINT" | "NOTHING_NEW" => StatusCode::CONFLICT,
        "INTERNAL" => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn admission_error(error: AdmissionError) -> Response {
    error_body(admission_status(&error), error.code(), error.detail())
}

fn result_error(error: ResultError) -> Response {
    let status = match error {
        ResultError::NotFound(_) => StatusCode::NOT_FOUND,
        ResultError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error.code(), error.detail())
}

pub(crate) async fn register_handler<R, N>(
    State(state): State<FestivalState<R, N>>,
    Path(user_id): Path<String>,
    Json(request): Json<RegistrationRequest>,
) -> Response
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    match state.admission.register_single(&UserId(user_id), request) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => admission_error(error),
    }
}

pub(crate) async fn batch_handler<R, N>(
    State(state): State<FestivalState<R, N>>,
    Path(user_id): Path<String>,
    Json(request): Json<BatchRequest>,
) -> Response
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    match state.admission.register_batch(&UserId(user_id), request.items) {
        Ok(batch) => {
            let rejected = batch.rejected.map(|item| {
                json!({
                    "index": item.index,
                    "program_id": item.program_id,
                    "error": item.error.code(),
                    "detail": item.error.detail(),
                })
            });
            let payload = json!({
                "created": batch.created,
                "skipped": batch.skipped,
                "rejected": rejected,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => admission_error(error),
    }
}

pub(crate) async fn quota_handler<R, N>(
    State(state): State<FestivalState<R, N>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    match state.admission.quota_usage(&UserId(user_id)) {
        Ok(usage) => (StatusCode::OK, Json(usage)).into_response(),
        Err(error) => admission_error(error),
    }
}

pub(crate) async fn grade_handler<R, N>(
    State(state): State<FestivalState<R, N>>,
    Path(registration_id): Path<String>,
    Json(request): Json<GradeRequest>,
) -> Response
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    match state
        .results
        .set_grade(&RegistrationId(registration_id), request.grade)
    {
        Ok(registration) => (StatusCode::OK, Json(registration)).into_response(),
        Err(error) => result_error(error),
    }
}

pub(crate) async fn cancel_handler<R, N>(
    State(state): State<FestivalState<R, N>>,
    Path(registration_id): Path<String>,
) -> Response
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    match state.results.cancel(&RegistrationId(registration_id)) {
        Ok(registration) => (StatusCode::OK, Json(registration)).into_response(),
        Err(error) => result_error(error),
    }
}

pub(crate) async fn leaderboard_handler<R, N>(
    State(state): State<FestivalState<R, N>>,
) -> Response
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    match state.scoring.leaderboard() {
        Ok(board) => (StatusCode::OK, Json(board)).into_response(),
        Err(error) => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            error.code(),
            json!({}),
        ),
    }
}
