//! API Handlers for the Confidential Record Store
//!
//! Thin HTTP layer over [`RecordStore`]. The store is the only writer; the
//! handlers translate JSON in and out and map [`StoreError`] to status codes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::types::*;
use crate::fhe::SimulatedCompute;
use crate::oracle::codec::payload_from_hex;
use crate::store::types::unix_now;
use crate::store::{CampaignAccumulator, RecordId, RecordStore, StoreError, StoreStats};

type ApiResult<T> = std::result::Result<T, (StatusCode, Json<ErrorResponse>)>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    /// Backs `/api/encrypt`, standing in for client-side encryption
    pub compute: Arc<SimulatedCompute>,
    pub version: String,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, compute: Arc<SimulatedCompute>) -> Self {
        Self {
            store,
            compute,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Create API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/stats", get(get_stats))
        .route("/api/encrypt", post(encrypt))
        .route("/api/records", post(create_record))
        .route("/api/records/:id", get(get_record))
        .route("/api/records/:id/decrypt", post(request_decryption))
        .route("/api/records/:id/revealed", get(get_revealed))
        .route("/api/oracle/callback", post(oracle_callback))
        .route("/api/campaigns", get(list_campaigns))
        .route("/api/campaigns/:name", get(get_campaign_total))
        .route("/api/campaigns/:name/accumulate", post(accumulate_campaign))
        .with_state(state)
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.store.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: unix_now(),
        version: state.version.clone(),
        records: stats.records,
        pending_requests: stats.pending_requests,
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.store.stats())
}

pub async fn encrypt(State(state): State<AppState>, Json(request): Json<EncryptRequest>) -> Json<EncryptResponse> {
    Json(EncryptResponse {
        encrypted_value: state.compute.encrypt_u32(request.value),
        encrypted_flag: state.compute.encrypt_bool(request.flag),
    })
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(request): Json<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<CreateRecordResponse>)> {
    let id = state
        .store
        .create_record(request.encrypted_value, request.encrypted_flag);
    let record = state.store.get_record(id).ok_or_else(|| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            &format!("record {} vanished after creation", id),
        )
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRecordResponse {
            id,
            created_at: record.created_at,
        }),
    ))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<crate::store::ConfidentialRecord>> {
    let record_id = RecordId(id);
    state
        .store
        .get_record(record_id)
        .map(Json)
        .ok_or_else(|| store_error(StoreError::NotFound(record_id)))
}

pub async fn request_decryption(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<(StatusCode, Json<DecryptionRequestResponse>)> {
    let record_id = RecordId(id);
    let request_id = state.store.request_decryption(record_id).map_err(store_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DecryptionRequestResponse { record_id, request_id }),
    ))
}

pub async fn get_revealed(State(state): State<AppState>, Path(id): Path<u64>) -> Json<RevealedRecordResponse> {
    let record_id = RecordId(id);
    let revealed = state.store.get_revealed(record_id);
    Json(RevealedRecordResponse {
        record_id,
        value: revealed.value,
        flag: revealed.flag,
        revealed: revealed.revealed,
    })
}

pub async fn oracle_callback(
    State(state): State<AppState>,
    Json(request): Json<OracleCallbackRequest>,
) -> ApiResult<Json<RevealedRecordResponse>> {
    let payload = match payload_from_hex(&request.payload) {
        Ok(payload) => payload,
        // request checks still come before payload decoding
        Err(e) => {
            let error = match state.store.request_record(request.request_id) {
                None => StoreError::UnknownRequest(request.request_id),
                Some(record_id) if state.store.get_revealed(record_id).revealed => {
                    StoreError::AlreadyRevealed(record_id)
                }
                Some(_) => e.into(),
            };
            return Err(store_error(error));
        }
    };
    let revealed = state
        .store
        .resolve_decryption(request.request_id, &payload, &request.proof)
        .map_err(store_error)?;

    Ok(Json(RevealedRecordResponse {
        record_id: state.store.request_record(request.request_id).unwrap_or(RecordId::NONE),
        value: revealed.value,
        flag: revealed.flag,
        revealed: revealed.revealed,
    }))
}

pub async fn accumulate_campaign(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<AccumulateRequest>,
) -> ApiResult<Json<CampaignTotalResponse>> {
    state
        .store
        .accumulate_campaign(&name, request.encrypted_delta)
        .map_err(store_error)?;
    Ok(Json(campaign_response(&state.store, &name)))
}

pub async fn get_campaign_total(State(state): State<AppState>, Path(name): Path<String>) -> Json<CampaignTotalResponse> {
    Json(campaign_response(&state.store, &name))
}

pub async fn list_campaigns(State(state): State<AppState>) -> Json<CampaignListResponse> {
    let campaigns = state.store.campaigns().into_iter().map(CampaignTotalResponse::from).collect();
    Json(CampaignListResponse { campaigns })
}

impl From<CampaignAccumulator> for CampaignTotalResponse {
    fn from(accumulator: CampaignAccumulator) -> Self {
        Self {
            initialized: accumulator.encrypted_total.is_initialized(),
            name: accumulator.name,
            encrypted_total: accumulator.encrypted_total,
            contributions: accumulator.contributions,
        }
    }
}

fn campaign_response(store: &RecordStore, name: &str) -> CampaignTotalResponse {
    match store.get_campaign(name) {
        Some(accumulator) => accumulator.into(),
        None => {
            let encrypted_total = store.get_campaign_total(name);
            CampaignTotalResponse {
                name: name.to_string(),
                initialized: encrypted_total.is_initialized(),
                encrypted_total,
                contributions: 0,
            }
        }
    }
}

fn store_error(error: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        StoreError::NotFound(_) | StoreError::UnknownRequest(_) => StatusCode::NOT_FOUND,
        StoreError::AlreadyRevealed(_) | StoreError::RequestPending { .. } => StatusCode::CONFLICT,
        StoreError::InvalidProof(_) => StatusCode::FORBIDDEN,
        StoreError::DecodeError(_) => StatusCode::BAD_REQUEST,
        StoreError::Compute(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Oracle(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    api_error(status, error.code(), &error.to_string())
}

fn api_error(status: StatusCode, error_code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: error_code.to_string(),
            message: message.to_string(),
            timestamp: unix_now(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoUtils, OracleSigningKey, SignatureScheme};
    use crate::oracle::{GatewayConfig, GatewayWorker, ProofVerifier, SimulatedGateway};
    use crate::store::StoreConfig;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> (Router, GatewayWorker) {
        let compute = Arc::new(SimulatedCompute::new());
        let signers = vec![OracleSigningKey::generate(SignatureScheme::Ed25519).unwrap()];
        let verifier = ProofVerifier::new(vec![signers[0].public_key()], 1).unwrap();
        let (gateway, worker) = SimulatedGateway::new(compute.clone(), signers, GatewayConfig::default());
        let store = Arc::new(RecordStore::new(
            StoreConfig::default(),
            compute.clone(),
            Arc::new(gateway),
            verifier,
        ));
        (create_router(AppState::new(store, compute)), worker)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router, value: u32, flag: bool) -> u64 {
        let (_, encrypted) = call(app, "POST", "/api/encrypt", Some(json!({ "value": value, "flag": flag }))).await;
        let (status, created) = call(app, "POST", "/api/records", Some(encrypted)).await;
        assert_eq!(status, StatusCode::CREATED);
        created["id"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _worker) = test_app();
        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["records"], 0);
    }

    #[tokio::test]
    async fn test_decryption_round_trip_over_http() {
        let (app, mut worker) = test_app();
        let id = create(&app, 42, true).await;
        assert_eq!(id, 1);

        let (status, record) = call(&app, "GET", "/api/records/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(record["encrypted_value"].as_str().unwrap().starts_with("0x"));

        let (status, requested) = call(&app, "POST", "/api/records/1/decrypt", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(requested["request_id"], 1);

        let (_, revealed) = call(&app, "GET", "/api/records/1/revealed", None).await;
        assert_eq!(revealed["revealed"], false);

        let job = worker.try_next_job().unwrap();
        let (payload, proof) = worker.prepare_callback(&job).unwrap();
        let callback = json!({
            "request_id": 1,
            "payload": CryptoUtils::to_hex(&payload),
            "proof": proof,
        });

        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(callback.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record_id"], 1);
        assert_eq!(body["value"], 42);
        assert_eq!(body["flag"], true);

        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(callback)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "ALREADY_REVEALED");

        let (_, revealed) = call(&app, "GET", "/api/records/1/revealed", None).await;
        assert_eq!(revealed["value"], 42);
        assert_eq!(revealed["revealed"], true);

        let (status, body) = call(&app, "POST", "/api/records/1/decrypt", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "ALREADY_REVEALED");
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let (app, _worker) = test_app();

        let (status, body) = call(&app, "GET", "/api/records/7", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");

        let (status, body) = call(&app, "POST", "/api/records/7/decrypt", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");

        create(&app, 1, false).await;
        call(&app, "POST", "/api/records/1/decrypt", None).await;
        let (status, body) = call(&app, "POST", "/api/records/1/decrypt", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "REQUEST_PENDING");

        let callback = json!({ "request_id": 99, "payload": "0x00", "proof": { "signatures": [] } });
        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(callback)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "UNKNOWN_REQUEST");

        let callback = json!({ "request_id": 1, "payload": "0xzz", "proof": { "signatures": [] } });
        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(callback)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "DECODE_ERROR");

        let callback = json!({ "request_id": 1, "payload": "0x00", "proof": { "signatures": [] } });
        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(callback)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "INVALID_PROOF");
    }

    #[tokio::test]
    async fn test_bad_hex_reports_request_errors_first() {
        let (app, mut worker) = test_app();
        let garbled = |request_id: u64| json!({ "request_id": request_id, "payload": "0xzz", "proof": { "signatures": [] } });

        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(garbled(5))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "UNKNOWN_REQUEST");

        create(&app, 3, true).await;
        call(&app, "POST", "/api/records/1/decrypt", None).await;
        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(garbled(1))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "DECODE_ERROR");

        let job = worker.try_next_job().unwrap();
        let (payload, proof) = worker.prepare_callback(&job).unwrap();
        let callback = json!({ "request_id": 1, "payload": CryptoUtils::to_hex(&payload), "proof": proof });
        let (status, _) = call(&app, "POST", "/api/oracle/callback", Some(callback)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "POST", "/api/oracle/callback", Some(garbled(1))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "ALREADY_REVEALED");
    }

    #[tokio::test]
    async fn test_campaign_endpoints() {
        let (app, _worker) = test_app();

        let (status, body) = call(&app, "GET", "/api/campaigns/summer", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["initialized"], false);

        for value in [5u32, 3] {
            let (_, encrypted) = call(&app, "POST", "/api/encrypt", Some(json!({ "value": value }))).await;
            let delta = json!({ "encrypted_delta": encrypted["encrypted_value"] });
            let (status, body) = call(&app, "POST", "/api/campaigns/summer/accumulate", Some(delta)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["initialized"], true);
        }

        let (_, body) = call(&app, "GET", "/api/campaigns/summer", None).await;
        assert_eq!(body["contributions"], 2);

        let (_, body) = call(&app, "GET", "/api/campaigns", None).await;
        assert_eq!(body["campaigns"].as_array().unwrap().len(), 1);
        assert_eq!(body["campaigns"][0]["name"], "summer");

        let foreign = json!({ "encrypted_delta": CryptoUtils::to_hex(&[0x42u8; 32]) });
        let (status, body) = call(&app, "POST", "/api/campaigns/summer/accumulate", Some(foreign)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "COMPUTE_ERROR");
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (app, _worker) = test_app();
        create(&app, 1, true).await;
        create(&app, 2, false).await;
        call(&app, "POST", "/api/records/2/decrypt", None).await;

        let (status, body) = call(&app, "GET", "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"], 2);
        assert_eq!(body["pending_requests"], 1);
        assert_eq!(body["revealed"], 0);
    }
}
