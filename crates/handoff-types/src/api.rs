//! API types for the Handoff relayer HTTP API.
//!
//! Request bodies pair a settlement request with the owner's EIP-712
//! signature over it. Responses expose committed ledger records, engine
//! events and read-only engine state.

use crate::{
	DelegatedAllowanceRequest, HandoffEvent, SettlementFlow, SettlementRecord,
	StandardPermitRequest,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/settlements/permit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleStandardPermitBody {
	pub request: StandardPermitRequest,
	/// Owner's 65-byte signature over the request under the Handoff domain.
	pub signature: Bytes,
}

/// Body of `POST /api/settlements/permit2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleDelegatedAllowanceBody {
	pub request: DelegatedAllowanceRequest,
	/// Owner's 65-byte signature over the request under the Handoff domain.
	pub signature: Bytes,
}

/// Response for a committed settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
	pub flow: SettlementFlow,
	pub namespaced_id: B256,
	pub record: SettlementRecord,
	/// Events appended by the settlement, in emission order.
	pub events: Vec<HandoffEvent>,
}

/// Response for `GET /api/settlements/{namespacedId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSettlementResponse {
	pub record: SettlementRecord,
	/// Present when this relayer submitted the settlement.
	pub settled_at: Option<u64>,
	pub relayer: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayersResponse {
	pub relayers: Vec<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeResponse {
	pub token: Address,
	/// Cumulative requested amount, as a decimal string.
	#[serde(with = "u256_serde")]
	pub volume: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	pub status: String,
	pub chain_id: u64,
	/// Address of the settlement instance.
	pub instance: Address,
	/// Address this relayer submits from.
	pub relayer: Address,
	pub paused: bool,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed input (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Caller lacks the required role or is blacklisted (403)
	Forbidden { error_type: String, message: String },
	/// Unknown settlement id (404)
	NotFound { error_type: String, message: String },
	/// Transaction id already settled (409)
	Conflict { error_type: String, message: String },
	/// Request well formed but rejected by the engine (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Engine paused or temporarily busy (503)
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details, retry_after) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => (error_type, message, details.clone(), None),
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => (error_type, message, None, *retry_after),
			APIError::Forbidden {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message, None, None),
		};

		ErrorResponse {
			error: error.clone(),
			message: message.clone(),
			details,
			retry_after,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		(status, Json(self.to_error_response())).into_response()
	}
}

/// Serde module for U256 as a decimal string.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(D::Error::custom)
	}
}
