use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, warn};

use crate::error::FieldError;
use crate::policy::{
    Engine, FieldData, GenerateResponse, ModulationResponse, RenderResponse, StatsResponse,
};

pub struct ApiError(FieldError);

impl From<FieldError> for ApiError {
    fn from(e: FieldError) -> Self {
        ApiError(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError(e.into())
    }
}

/// Bad request parameters become a 400, everything else a 500, both with
/// `{"error": message}`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            FieldError::NonFinite { .. } => {
                warn!("rejected request: {}", self.0);
                StatusCode::BAD_REQUEST
            }
            _ => {
                error!("request failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn finite(name: &'static str, value: f64) -> Result<f64, ApiError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FieldError::NonFinite { name, value }.into())
    }
}

#[derive(Deserialize)]
pub struct FrameQuery {
    pub time_factor: Option<f64>,
    pub distortion_factor: Option<f64>,
}

#[derive(Serialize)]
pub struct FrameResponse {
    pub data: FieldData,
    pub size: usize,
}

async fn generate_fractal(
    State(engine): State<Arc<Engine>>,
    Path((size, iterations, seed)): Path<(usize, usize, u64)>,
) -> ApiResult<GenerateResponse> {
    let resp = tokio::task::spawn_blocking(move || engine.generate(size, iterations, seed)).await?;
    Ok(Json(resp))
}

async fn apply_modulation(
    State(engine): State<Arc<Engine>>,
    Path(time_factor): Path<f64>,
) -> ApiResult<ModulationResponse> {
    let time_factor = finite("time_factor", time_factor)?;
    let resp = tokio::task::spawn_blocking(move || engine.modulated_reference(time_factor)).await?;
    Ok(Json(resp))
}

async fn frame(
    State(engine): State<Arc<Engine>>,
    Path((size, iterations, seed)): Path<(usize, usize, u64)>,
    Query(q): Query<FrameQuery>,
) -> ApiResult<FrameResponse> {
    let time_factor = finite("time_factor", q.time_factor.unwrap_or(0.0))?;
    let distortion_factor = finite("distortion_factor", q.distortion_factor.unwrap_or(0.0))?;
    let resp = tokio::task::spawn_blocking(move || {
        let grid = engine.process_frame(size, iterations, seed, time_factor, distortion_factor);
        FrameResponse {
            size: grid.w,
            data: FieldData::full(&grid),
        }
    })
    .await?;
    Ok(Json(resp))
}

async fn render_fractal(
    State(engine): State<Arc<Engine>>,
    Path((size, iterations, seed)): Path<(usize, usize, u64)>,
) -> ApiResult<RenderResponse> {
    let resp = tokio::task::spawn_blocking(move || engine.render(size, iterations, seed)).await??;
    Ok(Json(resp))
}

async fn performance_stats(State(engine): State<Arc<Engine>>) -> Json<StatsResponse> {
    Json(engine.stats())
}

/// API routes only.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/generate_fractal/{size}/{iterations}/{seed}", get(generate_fractal))
        .route("/apply_modulation/{time_factor}", get(apply_modulation))
        .route("/frame/{size}/{iterations}/{seed}", get(frame))
        .route("/render_fractal/{size}/{iterations}/{seed}", get(render_fractal))
        .route("/performance_stats", get(performance_stats))
        .with_state(engine)
}

/// API routes plus the static frontend, request tracing and CORS.
pub fn app(engine: Arc<Engine>, static_dir: &FsPath) -> Router {
    router(engine)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
