use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State, rejection::BytesRejection},
    http::{Method, Uri, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use futures::{StreamExt, stream};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crate::{
    config::AppConfig,
    error::ServiceError,
    generation::{self, BuiltResponse, ChunkStream},
    metrics::{self, RunningGuard, ServerMetrics},
    model::{ModelCatalog, ModelInfo, ModelList, VersionInfo},
    openai::EndpointKind,
    validation::validate,
};

/// Terminator event payload closing every stream.
pub const STREAM_DONE: &str = "[DONE]";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ModelCatalog>,
    pub metrics: Arc<ServerMetrics>,
}

pub fn build_router(config: Arc<AppConfig>, catalog: Arc<ModelCatalog>) -> Router {
    let metrics = Arc::new(ServerMetrics::new(catalog.ids()));
    build_router_with_metrics(config, catalog, metrics)
}

pub fn build_router_with_metrics(
    config: Arc<AppConfig>,
    catalog: Arc<ModelCatalog>,
    metrics: Arc<ServerMetrics>,
) -> Router {
    let body_limit = config.max_request_bytes;
    let cors = config.cors_permissive;
    let state = AppState { catalog, metrics };

    let router = Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route(
            "/v1/chat/completions",
            post(chat_completions).fallback(method_not_allowed),
        )
        .route(
            "/v1/completions",
            post(completions).fallback(method_not_allowed),
        )
        .route("/v1/models", get(list_models).fallback(method_not_allowed))
        .route(
            "/v1/models/*model_id",
            get(get_model).fallback(method_not_allowed),
        )
        .route("/version", get(version).fallback(method_not_allowed))
        .route("/metrics", get(render_metrics).fallback(method_not_allowed))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    let router = if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn chat_completions(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServiceError> {
    generate(&state, EndpointKind::ChatCompletions, body)
}

async fn completions(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServiceError> {
    generate(&state, EndpointKind::Completions, body)
}

/// Counts the request before the body is inspected, so oversized and
/// malformed bodies are still received requests.
fn generate(
    state: &AppState,
    kind: EndpointKind,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServiceError> {
    state.metrics.record_received(kind);
    let body = body?;
    let request = validate(kind, &body, &state.catalog)?;
    let running = state.metrics.track_running(&request.model);

    debug!(
        endpoint = kind.as_str(),
        model = %request.model,
        stream = request.stream,
        "serving generation request"
    );

    match generation::build(&request) {
        BuiltResponse::Complete(response) => {
            state.metrics.record_success(&request.model, response.usage());
            drop(running);
            Ok(Json(response).into_response())
        }
        BuiltResponse::Stream(chunks) => {
            state.metrics.record_success(&request.model, chunks.usage());
            Ok(event_stream(chunks, running))
        }
    }
}

/// Frames chunks as server-sent events; the running guard lives as long as
/// the stream does.
fn event_stream(chunks: ChunkStream, running: RunningGuard) -> Response {
    let done = stream::once(async move {
        drop(running);
        Ok::<_, axum::Error>(Event::default().data(STREAM_DONE))
    });
    let events = stream::iter(chunks)
        .map(|chunk| Event::default().json_data(chunk))
        .chain(done);
    Sse::new(events).into_response()
}

async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    Json(state.catalog.list())
}

async fn get_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelInfo>, ServiceError> {
    state
        .catalog
        .get(&model_id)
        .cloned()
        .map(Json)
        .ok_or(ServiceError::ModelNotFound(model_id))
}

async fn version(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(state.catalog.version().clone())
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, metrics::CONTENT_TYPE)],
        state.metrics.render(),
    )
}

async fn method_not_allowed(method: Method, uri: Uri) -> ServiceError {
    ServiceError::MethodNotAllowed {
        method,
        path: uri.path().to_string(),
    }
}

async fn route_not_found(method: Method, uri: Uri) -> ServiceError {
    ServiceError::RouteNotFound(format!("{method} {}", uri.path()))
}
