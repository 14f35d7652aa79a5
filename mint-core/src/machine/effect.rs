// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

use super::Sequence;

/// A chain read the driver must issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadQuery {
    ClaimConditionPrice,
    ActiveClaimConditionId,
    SupplyClaimedByWallet { condition_id: U256, wallet: Address },
    TotalClaimedSupply,
    NextTokenIdToMint,
    ContractName,
}

/// Outcome of a [`ReadQuery`]. Failures carry the collaborator's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResolution {
    ClaimConditionPrice(Result<U256, String>),
    ActiveClaimConditionId(Result<U256, String>),
    SupplyClaimedByWallet {
        condition_id: U256,
        wallet: Address,
        outcome: Result<u64, String>,
    },
    TotalClaimedSupply(Result<U256, String>),
    NextTokenIdToMint(Result<U256, String>),
    ContractName(Result<String, String>),
}

impl ReadResolution {
    pub fn query(&self) -> ReadQuery {
        match self {
            Self::ClaimConditionPrice(_) => ReadQuery::ClaimConditionPrice,
            Self::ActiveClaimConditionId(_) => ReadQuery::ActiveClaimConditionId,
            Self::SupplyClaimedByWallet {
                condition_id,
                wallet,
                ..
            } => ReadQuery::SupplyClaimedByWallet {
                condition_id: *condition_id,
                wallet: *wallet,
            },
            Self::TotalClaimedSupply(_) => ReadQuery::TotalClaimedSupply,
            Self::NextTokenIdToMint(_) => ReadQuery::NextTokenIdToMint,
            Self::ContractName(_) => ReadQuery::ContractName,
        }
    }

    pub fn is_failure(&self) -> bool {
        match self {
            Self::ClaimConditionPrice(outcome)
            | Self::ActiveClaimConditionId(outcome)
            | Self::TotalClaimedSupply(outcome)
            | Self::NextTokenIdToMint(outcome) => outcome.is_err(),
            Self::SupplyClaimedByWallet { outcome, .. } => outcome.is_err(),
            Self::ContractName(outcome) => outcome.is_err(),
        }
    }
}

/// Outcome of a claim transaction submitted for `recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimResolution {
    pub recipient: Address,
    pub quantity: u64,
    pub outcome: Result<B256, String>,
}

/// Side effect requested by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Read(ReadQuery),
    Claim { recipient: Address, quantity: u64 },
    /// Deliver `on_transition_elapsed(token)` once `after` has passed.
    EndTransition { token: u64, after: Duration },
}

/// Why the mint affordance is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimBlocked {
    #[error("no wallet connected")]
    NoWallet,
    #[error("mint is not available from the {sequence} screen")]
    NotMintable { sequence: Sequence },
    #[error("claimed amount is not known yet")]
    RemainingUnknown,
    #[error("wallet already claimed its full allocation")]
    NothingRemaining,
    #[error("quantity {quantity} outside 1..={remaining}")]
    QuantityOutOfRange { quantity: u64, remaining: u64 },
    #[error("a claim is already in flight")]
    ClaimInFlight,
}
