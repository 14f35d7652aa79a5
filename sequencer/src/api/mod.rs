// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod error;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Json, State};
use axum::routing::{get, post};
use mint_core::PortalView;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chain::parse_address;
use crate::mint_lane::{MintCommand, MintLaneHandle};
use crate::wallet::WalletSession;

pub use error::ApiError;

/// How long a wallet route waits for the lane to pick up the change.
const WALLET_APPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct AppState {
    pub lane: MintLaneHandle,
    pub wallet: WalletSession,
    /// Account the claim writer signs with. When set, it is the only wallet that may connect.
    pub signer_address: Option<Address>,
    pub queue_timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectRequest {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuantityRequest {
    quantity: serde_json::Number,
}

#[derive(Debug, Serialize)]
struct ViewResponse {
    ok: bool,
    view: PortalView,
}

impl ViewResponse {
    fn new(view: PortalView) -> Json<Self> {
        Json(Self { ok: true, view })
    }
}

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/view", get(get_view))
        .route("/wallet/connect", post(connect_wallet))
        .route("/wallet/disconnect", post(disconnect_wallet))
        .route("/quantity", post(set_quantity))
        .route("/quantity/increment", post(increment_quantity))
        .route("/quantity/decrement", post(decrement_quantity))
        .route("/claim", post(submit_claim))
        .route("/reset", post(reset_sequence))
        .route("/eligibility/check", post(check_eligibility))
        .route("/ws/view", get(ws::subscribe_view))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn get_view(State(state): State<Arc<AppState>>) -> Json<ViewResponse> {
    ViewResponse::new(state.lane.view())
}

async fn connect_wallet(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ViewResponse>, ApiError> {
    // An empty body connects the configured signer.
    let req: ConnectRequest = if body.is_empty() {
        ConnectRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::bad_request(format!("invalid JSON: {err}")))?
    };
    let requested = req
        .address
        .as_deref()
        .map(parse_address)
        .transpose()
        .map_err(ApiError::bad_request)?;
    let address = resolve_wallet(requested, state.signer_address)?;

    if state.wallet.connect(address) {
        info!(wallet = %address, "wallet connect requested");
    }
    let view = state
        .lane
        .wait_for_wallet(Some(address), WALLET_APPLY_TIMEOUT)
        .await?;
    Ok(ViewResponse::new(view))
}

async fn disconnect_wallet(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewResponse>, ApiError> {
    state.wallet.disconnect();
    let view = state.lane.wait_for_wallet(None, WALLET_APPLY_TIMEOUT).await?;
    Ok(ViewResponse::new(view))
}

async fn set_quantity(
    State(state): State<Arc<AppState>>,
    req: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Json<ViewResponse>, ApiError> {
    let Json(req) = req.map_err(|err| ApiError::bad_request(format!("invalid JSON: {err}")))?;
    execute(&state, MintCommand::SetQuantity(requested_quantity(&req.quantity))).await
}

async fn increment_quantity(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewResponse>, ApiError> {
    execute(&state, MintCommand::IncrementQuantity).await
}

async fn decrement_quantity(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewResponse>, ApiError> {
    execute(&state, MintCommand::DecrementQuantity).await
}

async fn submit_claim(State(state): State<Arc<AppState>>) -> Result<Json<ViewResponse>, ApiError> {
    execute(&state, MintCommand::SubmitClaim).await
}

async fn reset_sequence(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewResponse>, ApiError> {
    execute(&state, MintCommand::ResetSequence).await
}

async fn check_eligibility(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewResponse>, ApiError> {
    execute(&state, MintCommand::CheckEligibility).await
}

async fn execute(state: &AppState, command: MintCommand) -> Result<Json<ViewResponse>, ApiError> {
    let view = state.lane.execute(command, state.queue_timeout).await?;
    Ok(ViewResponse::new(view))
}

/// Picks the wallet to connect. With a signer configured only the signer may connect.
fn resolve_wallet(requested: Option<Address>, signer: Option<Address>) -> Result<Address, ApiError> {
    match (requested, signer) {
        (Some(requested), Some(signer)) if requested != signer => Err(ApiError::bad_request(
            format!("wallet {requested} does not match signer {signer}"),
        )),
        (_, Some(signer)) => Ok(signer),
        (Some(requested), None) => Ok(requested),
        (None, None) => Err(ApiError::bad_request(
            "address is required when no signer is configured",
        )),
    }
}

/// Negative input becomes 0 and anything past `u64` saturates; the sequencer clamps from there.
fn requested_quantity(value: &serde_json::Number) -> u64 {
    if let Some(quantity) = value.as_u64() {
        return quantity;
    }
    match value.as_f64() {
        Some(quantity) if quantity > 0.0 => quantity as u64,
        Some(_) => 0,
        None => u64::MAX,
    }
}
