// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::sync::Arc;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use tracing_subscriber::EnvFilter;

use mint_core::{Allowlist, MintSequencer};
use mint_sequencer::api::AppState;
use mint_sequencer::chain::{ChainConfig, RpcChainReader, RpcChainWriter, parse_address};
use mint_sequencer::mint_lane::{
    MintLane, MintLaneConfig, MintLaneError, MintLaneHandle, MintLaneInput,
};
use mint_sequencer::wallet::WalletSession;

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_CHAIN_ID: u64 = 33111;
const DEFAULT_CONTRACT_ADDRESS: &str = "0x0f3cec48434f7A9C4a68C3C8eAbfD6C03D96370e";
const DEFAULT_CURRENCY_SYMBOL: &str = "APE";
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_TRANSITION_DEBOUNCE: Duration = Duration::from_millis(500);
const DEFAULT_QUEUE_CAP: usize = 256;
const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 100;
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024;
const DEFAULT_METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let allowlist = match config.allowlist_path.as_deref() {
        Some(path) => Allowlist::load(path)?,
        None => {
            tracing::warn!("PORTAL_ALLOWLIST_PATH not set; every wallet is not allowlisted");
            Allowlist::default()
        }
    };

    let reader = RpcChainReader::connect(&config.chain).await?;
    let writer = match config.private_key.as_deref() {
        Some(key) => {
            let signer: PrivateKeySigner = key
                .parse()
                .map_err(|e| format!("invalid PORTAL_PRIVATE_KEY: {e}"))?;
            Some(RpcChainWriter::connect(&config.chain, signer).await?)
        }
        None => {
            tracing::warn!("PORTAL_PRIVATE_KEY not set; portal is read-only");
            None
        }
    };
    let signer_address = writer.as_ref().map(RpcChainWriter::signer_address);

    let machine = MintSequencer::new(Arc::new(allowlist), config.transition_debounce)
        .with_currency_symbol(config.currency_symbol.clone());
    let wallet = WalletSession::new();
    let (tx, rx) = tokio::sync::mpsc::channel::<MintLaneInput>(config.queue_capacity);
    let mint_lane = MintLane::new(
        rx,
        wallet.subscribe(),
        machine,
        reader,
        writer,
        MintLaneConfig {
            refresh_interval: config.refresh_interval,
            metrics_enabled: config.metrics_enabled,
            metrics_log_interval: config.metrics_log_interval,
        },
    );
    let lane = MintLaneHandle::new(tx, mint_lane.views());
    let (mut mint_lane_handle, mint_lane_stop) = mint_lane.spawn();

    let state = Arc::new(AppState {
        lane,
        wallet,
        signer_address,
        queue_timeout: Duration::from_millis(config.queue_timeout_ms),
    });

    let app = mint_sequencer::api::router(state, config.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;

    tracing::info!(
        address = %config.http_addr,
        chain_id = config.chain.chain_id,
        contract = %config.chain.contract_address,
        "listening"
    );
    tokio::select! {
        server_result = axum::serve(listener, app) => {
            mint_lane_stop.request_shutdown();
            let lane_result = mint_lane_handle.await;
            match lane_result {
                Ok(MintLaneError::ShutdownRequested) => {}
                Ok(err) => return Err(format!("mint lane exited during shutdown: {err}").into()),
                Err(join_err) => {
                    return Err(format!("mint lane join error during shutdown: {join_err}").into())
                }
            }
            server_result?;
        }
        lane_result = &mut mint_lane_handle => {
            match lane_result {
                Ok(err) => return Err(format!("mint lane exited: {err}").into()),
                Err(join_err) => {
                    return Err(format!("mint lane join error: {join_err}").into())
                }
            }
        }
    }

    Ok(())
}

struct Config {
    http_addr: String,
    chain: ChainConfig,
    allowlist_path: Option<String>,
    private_key: Option<String>,
    currency_symbol: String,
    refresh_interval: Duration,
    transition_debounce: Duration,
    queue_capacity: usize,
    queue_timeout_ms: u64,
    max_body_bytes: usize,
    metrics_enabled: bool,
    metrics_log_interval: Duration,
}

impl Config {
    fn from_env() -> Result<Self, String> {
        let rpc_url =
            std::env::var("PORTAL_RPC_URL").map_err(|_| "PORTAL_RPC_URL is required".to_string())?;
        let contract_address = parse_address(&env_string(
            "PORTAL_CONTRACT_ADDRESS",
            DEFAULT_CONTRACT_ADDRESS,
        ))?;
        Ok(Self {
            http_addr: env_string("PORTAL_HTTP_ADDR", DEFAULT_HTTP_ADDR),
            chain: ChainConfig {
                rpc_url,
                chain_id: env_u64("PORTAL_CHAIN_ID", DEFAULT_CHAIN_ID),
                contract_address,
            },
            allowlist_path: env_opt("PORTAL_ALLOWLIST_PATH"),
            private_key: env_opt("PORTAL_PRIVATE_KEY"),
            currency_symbol: env_string("PORTAL_CURRENCY_SYMBOL", DEFAULT_CURRENCY_SYMBOL),
            refresh_interval: Duration::from_millis(
                env_u64(
                    "PORTAL_REFRESH_INTERVAL_MS",
                    DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
                )
                .max(1),
            ),
            transition_debounce: Duration::from_millis(env_u64(
                "PORTAL_TRANSITION_DEBOUNCE_MS",
                DEFAULT_TRANSITION_DEBOUNCE.as_millis() as u64,
            )),
            queue_capacity: env_usize("PORTAL_QUEUE_CAP", DEFAULT_QUEUE_CAP).max(1),
            queue_timeout_ms: env_u64("PORTAL_QUEUE_TIMEOUT_MS", DEFAULT_QUEUE_TIMEOUT_MS),
            max_body_bytes: env_usize("PORTAL_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            metrics_enabled: env_bool("PORTAL_METRICS_ENABLED", false),
            metrics_log_interval: Duration::from_millis(
                env_u64(
                    "PORTAL_METRICS_LOG_INTERVAL_MS",
                    DEFAULT_METRICS_LOG_INTERVAL.as_millis() as u64,
                )
                .max(1),
            ),
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("1" | "true" | "TRUE" | "yes") => true,
        Some("0" | "false" | "FALSE" | "no") => false,
        _ => default,
    }
}
