// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use alloy_primitives::B256;
use serde::Serialize;

/// Units a wallet may still claim. Over-claimed wallets report 0, never a negative count.
pub fn remaining(allocation: u64, already_claimed: u64) -> u64 {
    allocation.saturating_sub(already_claimed)
}

/// Clamps a requested quantity into `1..=remaining`.
///
/// With nothing remaining the quantity is pinned at 1; the mint affordance is disabled
/// separately.
pub fn clamp_quantity(requested: u64, remaining: u64) -> u64 {
    requested.clamp(1, remaining.max(1))
}

/// Outcome of the latest claim transaction, for user notification only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimStatus {
    #[default]
    Idle,
    Pending {
        quantity: u64,
    },
    Confirmed {
        tx_hash: B256,
    },
    Failed {
        reason: String,
    },
}

impl ClaimStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}
