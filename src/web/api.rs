//! REST API endpoints

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::assets::{AssetDescriptor, AssetUpdate, SelectedAssetConfig};
use crate::output::sse;
use crate::pipeline::control::ControlType;
use crate::pipeline::signals::TrackingStatus;
use crate::AppState;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn error(message: &str) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        })
    }

    pub fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            error: None,
        })
    }
}

fn result_response<E: std::fmt::Display>(result: Result<(), E>) -> Response {
    match result {
        Ok(()) => ApiResponse::<()>::ok().into_response(),
        Err(e) => ApiResponse::error(&e.to_string()).into_response(),
    }
}

/// Status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: TrackingStatus,
    pub text: String,
    pub session_active: bool,
    pub camera_paused: bool,
    pub credits_remaining: Option<u32>,
    pub loaded: Vec<String>,
    pub loading: usize,
    pub version: String,
}

/// Get current status
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (session_active, camera_paused, credits_remaining) = {
        let session = state.session.lock().await;
        (
            session.is_active(),
            session.is_paused(),
            session.gate().remaining(),
        )
    };
    let status = state.status();

    ApiResponse::success(StatusResponse {
        text: status.to_string(),
        status,
        session_active,
        camera_paused,
        credits_remaining,
        loaded: state.lifecycle.loaded_ids(),
        loading: state.lifecycle.loading_count(),
        version: crate::VERSION.to_string(),
    })
}

/// List the asset catalog
pub async fn get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    let entries: Vec<AssetDescriptor> = registry.catalog().all().to_vec();
    ApiResponse::success(entries)
}

/// A control type with its display label
#[derive(Debug, Serialize)]
pub struct ControlTypeEntry {
    pub id: ControlType,
    pub label: &'static str,
}

/// List the control types, in display order
pub async fn get_control_types() -> impl IntoResponse {
    let entries: Vec<ControlTypeEntry> = ControlType::ALL
        .iter()
        .map(|&control| ControlTypeEntry {
            id: control,
            label: control.label(),
        })
        .collect();
    ApiResponse::success(entries)
}

/// List the selected asset instances
pub async fn list_assets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    let selected: Vec<SelectedAssetConfig> = registry.selected().to_vec();
    ApiResponse::success(selected)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAssetRequest {
    pub asset_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAssetResponse {
    pub instance_id: String,
}

/// Add an instance of a catalog asset
pub async fn add_asset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddAssetRequest>,
) -> Response {
    let asset_id = request.asset_id;
    let result = state.edit_registry(move |registry| registry.add(&asset_id)).await;
    match result {
        Ok(Ok(instance_id)) => {
            ApiResponse::success(AddAssetResponse { instance_id }).into_response()
        }
        Ok(Err(e)) => ApiResponse::error(&e.to_string()).into_response(),
        Err(e) => ApiResponse::error(&e.to_string()).into_response(),
    }
}

/// Change an instance's control type and/or scale
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    Json(update): Json<AssetUpdate>,
) -> Response {
    if let Some(scale) = update.scale {
        if !(scale.is_finite() && scale > 0.0) {
            return ApiResponse::error("scale must be a positive number").into_response();
        }
    }

    let id = instance_id.clone();
    match state.edit_registry(move |registry| registry.update(&id, update)).await {
        Ok(true) => ApiResponse::<()>::ok().into_response(),
        Ok(false) => {
            ApiResponse::error(&format!("Unknown asset instance: {}", instance_id)).into_response()
        }
        Err(e) => ApiResponse::error(&e.to_string()).into_response(),
    }
}

/// Remove an instance
pub async fn remove_asset(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
) -> Response {
    let id = instance_id.clone();
    match state.edit_registry(move |registry| registry.remove(&id)).await {
        Ok(true) => ApiResponse::<()>::ok().into_response(),
        Ok(false) => {
            ApiResponse::error(&format!("Unknown asset instance: {}", instance_id)).into_response()
        }
        Err(e) => ApiResponse::error(&e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayAnimationRequest {
    pub clip: String,
}

/// Crossfade a loaded instance to a named clip
pub async fn play_animation(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    Json(request): Json<PlayAnimationRequest>,
) -> Response {
    match state.lifecycle.play_animation(&instance_id, &request.clip) {
        Ok(played) => ApiResponse::success(serde_json::json!({ "played": played })).into_response(),
        Err(e) => ApiResponse::error(&e.to_string()).into_response(),
    }
}

pub async fn start_session(State(state): State<Arc<AppState>>) -> Response {
    result_response(state.start_session().await)
}

pub async fn stop_session(State(state): State<Arc<AppState>>) -> Response {
    result_response(state.stop_session().await)
}

pub async fn pause_camera(State(state): State<Arc<AppState>>) -> Response {
    result_response(state.session.lock().await.pause_camera())
}

pub async fn resume_camera(State(state): State<Arc<AppState>>) -> Response {
    result_response(state.session.lock().await.resume_camera())
}

/// SSE stream of drawn frames
pub async fn frame_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_frame_stream(state.subscribe_frames())
}

/// SSE stream of status changes
pub async fn status_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_status_stream(state.subscribe_status())
}
