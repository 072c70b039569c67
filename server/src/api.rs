use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ragcode_domain::SearchQuery;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

/// Background indexing started from the HTTP surface is bounded.
const INDEXING_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Results to return when the request does not say.
const DEFAULT_QUERY_RESULTS: usize = 5;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/index", post(handle_index))
        .route("/api/query", post(handle_query))
        .route("/api/status", get(handle_status))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IndexRequest {
    path: String,
}

/// POST /api/index: kick off background indexing of a path.
async fn handle_index(
    State(state): State<AppState>,
    payload: Result<Json<IndexRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": rejection.body_text()})),
            )
        }
    };

    let indexer = state.indexer.clone();
    let path = request.path.clone();
    tokio::spawn(async move {
        match tokio::time::timeout(INDEXING_TIMEOUT, indexer.index(&path)).await {
            Ok(Ok(job)) => info!(path, job = %job.id, "background indexing finished"),
            Ok(Err(e)) => error!(path, error = %e, "background indexing failed"),
            Err(_) => error!(path, "background indexing timed out"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({"status": "indexing_started", "path": request.path})),
    )
}

/// POST /api/query: retrieve context and answer the question.
async fn handle_query(
    State(state): State<AppState>,
    payload: Result<Json<SearchQuery>, JsonRejection>,
) -> impl IntoResponse {
    let Json(mut query) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": rejection.body_text()})),
            )
        }
    };

    if query.max_results == 0 {
        query.max_results = DEFAULT_QUERY_RESULTS;
    }

    let results = match state.retriever.retrieve(&query).await {
        Ok(results) => results,
        Err(e) => {
            error!(error = %e, "retrieval failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to retrieve context"})),
            );
        }
    };

    let prompt = state.prompter.generate(&query.query, &results);
    let messages = [ragcode_llm::ChatMessage::user(prompt)];

    let response = match state.llm.generate(&messages).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "llm generation failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to generate response"})),
            );
        }
    };

    info!(
        query = %query.query,
        results = results.len(),
        response_chars = response.len(),
        "query answered"
    );

    (
        StatusCode::OK,
        Json(json!({"response": response, "results": results})),
    )
}

/// GET /api/status: liveness probe.
async fn handle_status() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "alive"})))
}
