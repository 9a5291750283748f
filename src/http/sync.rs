use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use lb_sync::dto::status::{BasicOutcomeDto, ErrorDto, PassReportDto};
use lb_sync::model::trigger::ReconcileTrigger;
use lb_sync::service::queue_service::{PassQueue, PushOutcome};
use lb_sync::service::worker_service::StatusBoard;

type ApiError = (StatusCode, Json<ErrorDto>);

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    (status, Json(ErrorDto {
        code: String::from(code),
        message: String::from(message),
    }))
}

pub async fn healthz_handler() -> Json<BasicOutcomeDto> {
    Json(BasicOutcomeDto::ok())
}

pub async fn status_handler(
    State(status): State<StatusBoard>,
) -> Result<Json<PassReportDto>, ApiError> {
    status.read().await
        .clone()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "NOT_FOUND", "No pass completed yet"))
}

pub async fn sync_handler(
    State(queue): State<PassQueue>,
) -> Result<(StatusCode, Json<BasicOutcomeDto>), ApiError> {
    match queue.push(ReconcileTrigger::manual()) {
        PushOutcome::Queued => Ok((StatusCode::ACCEPTED, Json(BasicOutcomeDto::ok()))),
        PushOutcome::Coalesced => Err(api_error(StatusCode::CONFLICT, "ALREADY_QUEUED", "A manual pass is already pending")),
        PushOutcome::Closed => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "QUEUE_CLOSED", "Pass queue is closed")),
    }
}
