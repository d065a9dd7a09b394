//! HTTP handlers for the relayer API.
//!
//! Engine operations are synchronous and reject overlapping calls, so
//! mutating calls queue on the server's sequencer and then run on the
//! blocking pool.

pub mod settlement;
pub mod status;

use crate::server::AppState;
use handoff_core::{HandoffEngine, HandoffError};
use handoff_types::APIError;
use std::future::Future;

/// Maps an engine rejection onto an HTTP error with the engine's error code.
pub fn engine_error(error: HandoffError) -> APIError {
	let error_type = error.code().to_string();
	let message = error.to_string();

	match error {
		HandoffError::AccessDenied(_) | HandoffError::BlacklistedParty(_) => {
			APIError::Forbidden {
				error_type,
				message,
			}
		},
		HandoffError::InvalidSignature
		| HandoffError::InvalidRequest(_)
		| HandoffError::ZeroAddress => APIError::BadRequest {
			error_type,
			message,
			details: None,
		},
		HandoffError::DuplicateTransaction(_) | HandoffError::RelayerAlreadyExists(_) => {
			APIError::Conflict {
				error_type,
				message,
			}
		},
		HandoffError::RelayerNotFound(_) => APIError::NotFound {
			error_type,
			message,
		},
		HandoffError::Paused => APIError::ServiceUnavailable {
			error_type,
			message,
			retry_after: None,
		},
		HandoffError::Reentrancy => APIError::ServiceUnavailable {
			error_type,
			message,
			retry_after: Some(1),
		},
		HandoffError::PermitFailed
		| HandoffError::Permit2Failed
		| HandoffError::TransferFailed
		| HandoffError::InsufficientBalance { .. }
		| HandoffError::NotPaused
		| HandoffError::VolumeOverflow(_) => APIError::UnprocessableEntity {
			error_type,
			message,
			details: None,
		},
		HandoffError::Chain(_) => APIError::InternalServerError {
			error_type,
			message,
		},
	}
}

/// Runs `operation` against the engine on the blocking pool, after every
/// engine call queued before it has finished.
pub async fn execute<T, F>(state: &AppState, operation: F) -> Result<T, APIError>
where
	T: Send + 'static,
	F: FnOnce(&HandoffEngine) -> Result<T, HandoffError> + Send + 'static,
{
	let _turn = state.sequencer.lock().await;
	let engine = state.context.engine.clone();

	match tokio::task::spawn_blocking(move || operation(&engine)).await {
		Ok(result) => result.map_err(engine_error),
		Err(e) => {
			tracing::error!(error = %e, "Engine task failed");
			Err(internal_error("engine task failed"))
		},
	}
}

/// Runs `work` as a detached task and waits for it up to the configured
/// timeout.
///
/// Work that outlives the wait is not cancelled; it runs to completion,
/// including whatever it does after the engine call returns.
pub async fn within_timeout<T, W>(state: &AppState, work: W) -> Result<T, APIError>
where
	T: Send + 'static,
	W: Future<Output = Result<T, APIError>> + Send + 'static,
{
	let task = tokio::spawn(work);

	match tokio::time::timeout(state.timeout, task).await {
		Ok(Ok(result)) => result,
		Ok(Err(e)) => {
			tracing::error!(error = %e, "Request task failed");
			Err(internal_error("request task failed"))
		},
		Err(_) => Err(APIError::ServiceUnavailable {
			error_type: "TIMEOUT".to_string(),
			message: format!("engine did not respond within {:?}", state.timeout),
			retry_after: Some(state.timeout.as_secs().max(1)),
		}),
	}
}

fn internal_error(message: &str) -> APIError {
	APIError::InternalServerError {
		error_type: "INTERNAL_ERROR".to_string(),
		message: message.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, B256, U256};
	use handoff_chain::ChainError;

	#[test]
	fn test_engine_errors_map_to_status_codes() {
		let cases = [
			(HandoffError::AccessDenied(Address::ZERO), 403),
			(HandoffError::BlacklistedParty(Address::ZERO), 403),
			(HandoffError::InvalidSignature, 400),
			(HandoffError::DuplicateTransaction(B256::ZERO), 409),
			(HandoffError::Paused, 503),
			(HandoffError::Reentrancy, 503),
			(HandoffError::PermitFailed, 422),
			(
				HandoffError::InsufficientBalance {
					available: U256::ZERO,
					requested: U256::from(1),
				},
				422,
			),
			(HandoffError::Chain(ChainError::Reverted("x".into())), 500),
		];

		for (error, status) in cases {
			let code = error.code();
			let api = engine_error(error);
			assert_eq!(api.status_code(), status, "{}", code);
			assert_eq!(api.to_error_response().error, code);
		}
	}
}
