//! HTTP server for the Handoff relayer API.

use crate::apis;
use axum::{
	extract::DefaultBodyLimit,
	http::{HeaderName, HeaderValue, Method},
	routing::{get, post},
	Router,
};
use handoff_config::{ApiConfig, CorsConfig};
use handoff_core::RelayerContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub context: RelayerContext,
	/// Upper bound on how long a handler waits for the engine.
	pub timeout: Duration,
	/// Queues engine calls so that only one reaches the engine at a time.
	pub sequencer: Arc<Mutex<()>>,
}

/// Builds the API router with its middleware.
pub fn router(context: RelayerContext, api_config: &ApiConfig) -> Router {
	let state = AppState {
		context,
		timeout: Duration::from_secs(api_config.timeout_seconds),
		sequencer: Arc::new(Mutex::new(())),
	};

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route(
					"/settlements/permit",
					post(apis::settlement::settle_standard_permit),
				)
				.route(
					"/settlements/permit2",
					post(apis::settlement::settle_delegated_allowance),
				)
				.route("/settlements/{id}", get(apis::settlement::get_settlement))
				.route("/relayers", get(apis::status::get_relayers))
				.route("/volume/{token}", get(apis::status::get_volume))
				.route("/health", get(apis::status::health)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let origins = if cors.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::from(Any)
	} else {
		AllowOrigin::list(
			cors.allowed_origins
				.iter()
				.filter_map(|o| o.parse::<HeaderValue>().ok()),
		)
	};
	let methods: Vec<Method> = cors
		.allowed_methods
		.iter()
		.filter_map(|m| m.parse().ok())
		.collect();
	let headers: Vec<HeaderName> = cors
		.allowed_headers
		.iter()
		.filter_map(|h| h.parse().ok())
		.collect();

	CorsLayer::new()
		.allow_origin(origins)
		.allow_methods(methods)
		.allow_headers(headers)
}

/// Serves the API until the listener fails.
pub async fn start_server(api_config: ApiConfig, context: RelayerContext) -> std::io::Result<()> {
	let app = router(context, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Handoff relayer API starting on {}", bind_address);

	axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{TestNode, PROVIDER, TOKEN};
	use alloy_primitives::U256;
	use axum::{
		body::{to_bytes, Body},
		http::{Request, StatusCode},
	};
	use handoff_types::{
		ErrorResponse, GetSettlementResponse, HealthResponse, RelayersResponse,
		SettleStandardPermitBody, SettlementResponse, StorageKey, VolumeResponse,
	};
	use serde::de::DeserializeOwned;
	use tower::ServiceExt;

	fn api_config() -> ApiConfig {
		ApiConfig {
			enabled: true,
			host: "127.0.0.1".to_string(),
			port: 3000,
			timeout_seconds: 30,
			max_request_size: 1024 * 1024,
			cors: None,
		}
	}

	async fn send<T: DeserializeOwned>(
		app: Router,
		request: Request<Body>,
	) -> (StatusCode, T) {
		let response = app.oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	fn post_json(uri: &str, body: &impl serde::Serialize) -> Request<Body> {
		Request::post(uri)
			.header("content-type", "application/json")
			.body(Body::from(serde_json::to_vec(body).unwrap()))
			.unwrap()
	}

	fn get(uri: &str) -> Request<Body> {
		Request::get(uri).body(Body::empty()).unwrap()
	}

	#[tokio::test]
	async fn test_settle_and_read_back() {
		let node = TestNode::new();
		let app = router(node.context.clone(), &api_config());
		let (request, signature) = node.standard_request(100, 0x11);

		let (status, settled): (_, SettlementResponse) = send(
			app.clone(),
			post_json(
				"/api/settlements/permit",
				&SettleStandardPermitBody { request, signature },
			),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(settled.record.provider, PROVIDER);
		assert_eq!(settled.events.len(), 1);

		let receipt_exists = node
			.context
			.storage
			.exists(StorageKey::Settlements, &settled.namespaced_id.to_string())
			.await
			.unwrap();
		assert!(receipt_exists);

		let (status, fetched): (_, GetSettlementResponse) = send(
			app.clone(),
			get(&format!("/api/settlements/{}", settled.namespaced_id)),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(fetched.record, settled.record);
		assert_eq!(fetched.relayer, Some(node.context.relayer));

		let (_, volume): (_, VolumeResponse) =
			send(app, get(&format!("/api/volume/{}", TOKEN))).await;
		assert_eq!(volume.volume, U256::from(100));
	}

	#[tokio::test]
	async fn test_duplicate_settlement_conflicts() {
		let node = TestNode::new();
		let app = router(node.context.clone(), &api_config());
		let (request, signature) = node.standard_request(100, 0x22);
		let body = SettleStandardPermitBody { request, signature };

		let (status, _): (_, SettlementResponse) =
			send(app.clone(), post_json("/api/settlements/permit", &body)).await;
		assert_eq!(status, StatusCode::OK);

		let (status, error): (_, ErrorResponse) =
			send(app, post_json("/api/settlements/permit", &body)).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(error.error, "DUPLICATE_TRANSACTION");
	}

	#[tokio::test]
	async fn test_paused_engine_is_unavailable() {
		let node = TestNode::new();
		node.context.engine.pause(crate::testing::OWNER).unwrap();
		let app = router(node.context.clone(), &api_config());
		let (request, signature) = node.standard_request(100, 0x33);

		let (status, error): (_, ErrorResponse) = send(
			app.clone(),
			post_json(
				"/api/settlements/permit",
				&SettleStandardPermitBody { request, signature },
			),
		)
		.await;
		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(error.error, "PAUSED");

		let (_, health): (_, HealthResponse) = send(app, get("/api/health")).await;
		assert!(health.paused);
		assert_eq!(health.chain_id, 31337);
	}

	#[tokio::test]
	async fn test_unknown_and_malformed_ids() {
		let node = TestNode::new();
		let app = router(node.context.clone(), &api_config());

		let (status, error): (_, ErrorResponse) = send(
			app.clone(),
			get(&format!("/api/settlements/{}", alloy_primitives::B256::ZERO)),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(error.error, "SETTLEMENT_NOT_FOUND");

		let (status, error): (_, ErrorResponse) =
			send(app.clone(), get("/api/settlements/not-hex")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(error.error, "INVALID_SETTLEMENT_ID");

		let (status, _): (_, ErrorResponse) = send(app, get("/api/volume/0x1234")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn test_relayers_listing() {
		let node = TestNode::new();
		let app = router(node.context.clone(), &api_config());

		let (_, body): (_, RelayersResponse) = send(app, get("/api/relayers")).await;
		assert_eq!(body.relayers, vec![node.context.relayer]);
	}
}
