//! Read-only engine state.

use crate::server::AppState;
use alloy_primitives::Address;
use axum::{
	extract::{Path, State},
	response::Json,
};
use handoff_types::{APIError, HealthResponse, RelayersResponse, VolumeResponse};

/// Handles GET /api/relayers.
pub async fn get_relayers(State(state): State<AppState>) -> Json<RelayersResponse> {
	Json(RelayersResponse {
		relayers: state.context.engine.get_relayers(),
	})
}

/// Handles GET /api/volume/{token}.
pub async fn get_volume(
	Path(token): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<VolumeResponse>, APIError> {
	let token: Address = token.parse().map_err(|_| APIError::BadRequest {
		error_type: "INVALID_TOKEN".to_string(),
		message: format!("Token must be a 20-byte hex address: {}", token),
		details: None,
	})?;

	Ok(Json(VolumeResponse {
		token,
		volume: state.context.engine.total_volume(token),
	}))
}

/// Handles GET /api/health.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	let engine = &state.context.engine;
	Json(HealthResponse {
		status: "ok".to_string(),
		chain_id: engine.chain_id(),
		instance: engine.instance(),
		relayer: state.context.relayer,
		paused: engine.paused(),
	})
}
