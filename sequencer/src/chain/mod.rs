// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Chain collaborators: read-only contract queries and the claim writer.
//!
//! The lane only sees the [`ChainReader`] and [`ChainWriter`] traits; the JSON-RPC
//! adapters in [`rpc`] are wired in by `main`.

mod drop_erc721;
mod rpc;

use std::future::Future;

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

pub use rpc::{RpcChainReader, RpcChainWriter};

/// Process-wide chain settings, built once at startup.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Address,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("provider/transport: {0}")]
    Transport(String),
    #[error("contract call: {0}")]
    Contract(String),
    #[error("connected to chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
    #[error("{what} does not fit in 64 bits: {value}")]
    OutOfRange { what: &'static str, value: U256 },
    #[error("claim transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
    #[error("no signer configured; portal is read-only")]
    NoSigner,
}

impl ChainError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn contract(err: impl std::fmt::Display) -> Self {
        Self::Contract(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Read-only contract queries. Each call loads and fails independently.
pub trait ChainReader: Send + Sync + 'static {
    /// Price per token of the active claim condition, in wei.
    fn claim_condition_price(&self) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn active_claim_condition_id(&self) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn supply_claimed_by_wallet(
        &self,
        condition_id: U256,
        wallet: Address,
    ) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn total_claimed_supply(&self) -> impl Future<Output = Result<U256, ChainError>> + Send;

    /// Proxy for the total number of tokens minted so far.
    fn next_token_id_to_mint(&self) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn contract_name(&self) -> impl Future<Output = Result<String, ChainError>> + Send;
}

/// Submits claim transactions and waits for their confirmation.
pub trait ChainWriter: Send + Sync + 'static {
    fn claim(
        &self,
        recipient: Address,
        quantity: u64,
    ) -> impl Future<Output = Result<ClaimReceipt, ChainError>> + Send;
}

/// `None` is a read-only portal: every claim fails.
impl<W: ChainWriter> ChainWriter for Option<W> {
    async fn claim(&self, recipient: Address, quantity: u64) -> Result<ClaimReceipt, ChainError> {
        match self {
            Some(writer) => writer.claim(recipient, quantity).await,
            None => Err(ChainError::NoSigner),
        }
    }
}

/// Parses a `0x`-prefixed 20-byte hex address, as given in config and API bodies.
pub fn parse_address(value: &str) -> Result<Address, String> {
    if !value.starts_with("0x") {
        return Err("address must be 0x-prefixed hex".to_string());
    }
    let bytes =
        alloy_primitives::hex::decode(value).map_err(|err| format!("invalid address hex: {err}"))?;
    if bytes.len() != 20 {
        return Err("address must be 20 bytes".to_string());
    }
    Ok(Address::from_slice(&bytes))
}
