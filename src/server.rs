//! HTTP boundary: routes, shared state, and the mapping from `TrackError`
//! to status codes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::enrich::Enricher;
use crate::error::TrackError;
use crate::response::{MessageBody, RichTrackInfo, SimpleTrackInfo};
use crate::track;
use crate::zone::ZoneController;

pub const HEALTH_MESSAGE: &str = "I am a teapot";
const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Clone)]
pub struct AppState {
    pub zones: Arc<dyn ZoneController>,
    pub enricher: Arc<Enricher>,
}

impl AppState {
    pub fn new(zones: Arc<dyn ZoneController>, enricher: Enricher) -> Self {
        Self {
            zones,
            enricher: Arc::new(enricher),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/simple_track_info/{zone}", get(simple_track_info))
        .route("/rich_track_info/{zone}", get(rich_track_info))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError(TrackError);

impl From<TrackError> for ApiError {
    fn from(err: TrackError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(TrackError::Transport(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_benign() {
            info!("{}", self.0);
            (StatusCode::IM_A_TEAPOT, self.0.to_string())
        } else {
            error!("request failed: {:#}", anyhow::Error::from(self.0));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            )
        };

        (status, Json(MessageBody { message })).into_response()
    }
}

async fn root() -> Json<&'static str> {
    Json(HEALTH_MESSAGE)
}

/// GET /simple_track_info/{zone}
#[tracing::instrument(skip(state))]
async fn simple_track_info(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<SimpleTrackInfo>, ApiError> {
    let raw = track::fetch_by_name(state.zones.as_ref(), &zone).await?;
    Ok(Json(SimpleTrackInfo::from(&raw)))
}

/// GET /rich_track_info/{zone}
#[tracing::instrument(skip(state))]
async fn rich_track_info(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<RichTrackInfo>, ApiError> {
    let raw = track::fetch_by_name(state.zones.as_ref(), &zone).await?;
    let enriched = state.enricher.enrich(raw).await?;
    Ok(Json(RichTrackInfo::from_track(&enriched)?))
}
