// HTTP request handlers
use crate::application::evaluation_service::{MonitorInfo, MonitorReading};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct EvaluateQuery {
    /// Evaluation time, defaults to now
    pub time: Option<DateTime<Utc>>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/monitors", get(list_monitors))
        .route("/monitors/:id/evaluate", post(evaluate_monitor))
        .route("/evaluate", post(evaluate_all))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List configured monitors
pub async fn list_monitors(State(state): State<Arc<AppState>>) -> Json<Vec<MonitorInfo>> {
    Json(state.evaluation_service.monitors())
}

/// Run one evaluation cycle for a monitor
pub async fn evaluate_monitor(
    Path(id): Path<String>,
    Query(query): Query<EvaluateQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<MonitorReading>, StatusCode> {
    let time = query.time.unwrap_or_else(Utc::now);

    match state.evaluation_service.evaluate(&id, time).await {
        Some(reading) => Ok(Json(reading)),
        None => {
            tracing::warn!("Evaluation requested for unknown monitor {}", id);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Run one evaluation cycle for every monitor
pub async fn evaluate_all(
    Query(query): Query<EvaluateQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<MonitorReading>> {
    let time = query.time.unwrap_or_else(Utc::now);
    Json(state.evaluation_service.evaluate_all(time).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::evaluation_service::EvaluationService;
    use crate::application::operating_time_calculator::OperatingTimeCalculator;
    use crate::domain::{Sample, SampleType, SampleValue};
    use crate::infrastructure::memory_stream::MemorySampleStream;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::TimeZone;
    use tower::ServiceExt;

    fn app() -> Router {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let calculator = OperatingTimeCalculator::new("conveyor")
            .using_condition(Arc::new(MemorySampleStream::with_samples(
                "conveyor.running",
                SampleType::Boolean,
                vec![Sample::good(start, SampleValue::Boolean(true))],
            )))
            .store_status_in(Arc::new(MemorySampleStream::new(
                "conveyor.status",
                SampleType::String,
            )));
        router(Arc::new(AppState {
            evaluation_service: EvaluationService::new(vec![calculator]),
        }))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_evaluate_monitor() {
        let response = app()
            .oneshot(
                Request::post("/monitors/conveyor/evaluate?time=2025-06-01T08:01:30Z")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["monitor_id"], "conveyor");
        assert_eq!(body["sample"]["value"], 90.0);
        assert_eq!(body["sample"]["quality"], "good");
        assert_eq!(body["state"]["kind"], "Operating");
    }

    #[tokio::test]
    async fn test_unknown_monitor_is_not_found() {
        let response = app()
            .oneshot(Request::post("/monitors/nope/evaluate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_monitors() {
        let response = app()
            .oneshot(Request::get("/monitors").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body[0]["id"], "conveyor");
        assert_eq!(body[0]["unit"], "seconds");
        assert_eq!(body[0]["status"], "conveyor.status");
    }
}
