use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::labeler::Labeler;
use crate::settings;

use super::label::{REQUIRED_MESSAGE, ServerError, label_request};
use super::models::{AddLabelRequest, AddLabelResponse, ErrorResponse};
use super::state::ServerState;
use super::util::{public_base_url, resolve_image_path};

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let body_limit = settings.server_body_limit;
    let labeler = Labeler::new(&settings);
    std::fs::create_dir_all(labeler.output_dir()).with_context(|| {
        format!(
            "failed to create output dir: {}",
            labeler.output_dir().display()
        )
    })?;
    let state = Arc::new(ServerState { settings, labeler });
    let app = Router::new()
        .route("/health", get(health))
        .route("/add-label", post(add_label))
        .route("/images/:name", get(image))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(cors_middleware));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("server is running on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

fn error_response(err: ServerError) -> (StatusCode, Json<ErrorResponse>) {
    (err.status, Json(ErrorResponse { error: err.message }))
}

/// A body that is not JSON or has mistyped fields counts as missing input.
/// Anything else is a generic failure.
fn rejection_error(rejection: JsonRejection) -> ServerError {
    let missing_input = matches!(
        rejection,
        JsonRejection::MissingJsonContentType(_) | JsonRejection::JsonDataError(_)
    );
    if missing_input {
        debug!("add-label body rejected: {}", rejection.body_text());
        return ServerError::bad_request(REQUIRED_MESSAGE);
    }
    error!("failed to read add-label body: {}", rejection.body_text());
    ServerError::internal()
}

async fn add_label(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    payload: Result<Json<AddLabelRequest>, JsonRejection>,
) -> Result<Json<AddLabelResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(payload) = payload.map_err(|rejection| error_response(rejection_error(rejection)))?;
    let base_url = public_base_url(&state.settings, &headers);
    let result =
        tokio::task::spawn_blocking(move || label_request(state.as_ref(), payload, &base_url))
            .await
            .map_err(|err| {
                error!("label task failed: {}", err);
                error_response(ServerError::internal())
            })?;

    result.map(Json).map_err(error_response)
}

async fn image(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let path = resolve_image_path(state.labeler.output_dir(), &name).map_err(|status| {
        let message = if status == StatusCode::FORBIDDEN {
            "image path is not allowed"
        } else {
            "image not found"
        };
        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
    })?;
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        error!("failed to read image {}: {}", path.display(), err);
        error_response(ServerError::internal())
    })?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}
