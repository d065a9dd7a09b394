//! Settlement endpoints.

use super::{execute, within_timeout};
use crate::server::AppState;
use alloy_primitives::B256;
use axum::{
	extract::{Path, State},
	response::Json,
};
use handoff_core::SettlementOutcome;
use handoff_storage::StorageError;
use handoff_types::{
	truncate_id, APIError, GetSettlementResponse, SettleDelegatedAllowanceBody,
	SettleStandardPermitBody, SettlementReceipt, SettlementResponse, StorageKey,
};

/// Handles POST /api/settlements/permit.
pub async fn settle_standard_permit(
	State(state): State<AppState>,
	Json(body): Json<SettleStandardPermitBody>,
) -> Result<Json<SettlementResponse>, APIError> {
	let relayer = state.context.relayer;
	let task_state = state.clone();
	let response = within_timeout(&state, async move {
		let outcome = execute(&task_state, move |engine| {
			engine.settle_standard_permit(relayer, &body.request, &body.signature)
		})
		.await?;
		Ok::<_, APIError>(persist_receipt(&task_state, outcome).await)
	})
	.await?;

	Ok(Json(response))
}

/// Handles POST /api/settlements/permit2.
pub async fn settle_delegated_allowance(
	State(state): State<AppState>,
	Json(body): Json<SettleDelegatedAllowanceBody>,
) -> Result<Json<SettlementResponse>, APIError> {
	let relayer = state.context.relayer;
	let task_state = state.clone();
	let response = within_timeout(&state, async move {
		let outcome = execute(&task_state, move |engine| {
			engine.settle_delegated_allowance(relayer, &body.request, &body.signature)
		})
		.await?;
		Ok::<_, APIError>(persist_receipt(&task_state, outcome).await)
	})
	.await?;

	Ok(Json(response))
}

/// Stores the receipt of a committed settlement.
///
/// Runs in the same task as the engine call, so a receipt is written even
/// when the handler stopped waiting.
///
/// The ledger record is authoritative. A receipt that cannot be written is
/// logged and the settlement is still reported as committed.
async fn persist_receipt(state: &AppState, outcome: SettlementOutcome) -> SettlementResponse {
	let id = outcome.record.id;
	let receipt = SettlementReceipt {
		flow: outcome.flow,
		relayer: state.context.relayer,
		record: outcome.record.clone(),
		settled_at: state.context.chain.timestamp(),
	};

	if let Err(e) = state
		.context
		.storage
		.store_new(StorageKey::Settlements, &id.to_string(), &receipt)
		.await
	{
		tracing::warn!(
			id = %truncate_id(&id.to_string()),
			error = %e,
			"Failed to persist settlement receipt"
		);
	}

	SettlementResponse {
		flow: outcome.flow,
		namespaced_id: id,
		record: outcome.record,
		events: outcome.events,
	}
}

/// Handles GET /api/settlements/{namespacedId}.
pub async fn get_settlement(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<GetSettlementResponse>, APIError> {
	let id: B256 = id.parse().map_err(|_| APIError::BadRequest {
		error_type: "INVALID_SETTLEMENT_ID".to_string(),
		message: format!("Settlement id must be 32 bytes of hex: {}", id),
		details: None,
	})?;

	let record = state
		.context
		.engine
		.get_settlement(&id)
		.ok_or_else(|| APIError::NotFound {
			error_type: "SETTLEMENT_NOT_FOUND".to_string(),
			message: format!("No settlement recorded under {}", id),
		})?;

	let receipt = match state
		.context
		.storage
		.retrieve::<SettlementReceipt>(StorageKey::Settlements, &id.to_string())
		.await
	{
		Ok(receipt) => Some(receipt),
		Err(StorageError::NotFound) => None,
		Err(e) => {
			tracing::warn!(error = %e, "Failed to read settlement receipt");
			None
		},
	};

	Ok(Json(GetSettlementResponse {
		record,
		settled_at: receipt.as_ref().map(|r| r.settled_at),
		relayer: receipt.map(|r| r.relayer),
	}))
}
