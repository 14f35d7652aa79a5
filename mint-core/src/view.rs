// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use serde::Serialize;

use crate::claim::ClaimStatus;
use crate::field::Field;
use crate::machine::Sequence;
use crate::pricing::{PRICE_PLACEHOLDER, Price};

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortalView {
    pub sequence: Sequence,
    pub wallet: Option<String>,
    pub allocation: u64,
    pub quantity: u64,
    pub remaining: Field<u64>,
    pub unit_price: Field<Price>,
    pub total_price: Field<Price>,
    pub minted_amount: u64,
    pub supply: SupplyView,
    pub contract_name: Field<String>,
    pub currency_symbol: String,
    pub claim: ClaimStatus,
    pub can_mint: bool,
    /// Wallet is allowlisted but has nothing left to claim.
    pub max_claimed: bool,
    pub is_loading: bool,
    pub is_transitioning: bool,
    /// The screen to draw: transitions and loading always win over the sequence.
    pub shows_loading: bool,
    pub labels: ViewLabels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyView {
    pub claimed: Field<String>,
    pub total: Field<String>,
}

impl SupplyView {
    pub fn summary(&self) -> String {
        format!(
            "{} minted out of {}",
            self.claimed.display_or(PRICE_PLACEHOLDER),
            self.total.display_or(PRICE_PLACEHOLDER)
        )
    }
}

/// Rendered text, with placeholders for anything not yet known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewLabels {
    pub unit_price: String,
    pub total_price: String,
    pub supply: String,
}

impl ViewLabels {
    pub fn new(
        unit_price: &Field<Price>,
        total_price: &Field<Price>,
        supply: &SupplyView,
        currency_symbol: &str,
    ) -> Self {
        Self {
            unit_price: price_label(unit_price, currency_symbol),
            total_price: price_label(total_price, currency_symbol),
            supply: supply.summary(),
        }
    }
}

fn price_label(price: &Field<Price>, currency_symbol: &str) -> String {
    let amount = price.display_or(PRICE_PLACEHOLDER);
    if currency_symbol.is_empty() {
        amount
    } else {
        format!("{amount} {currency_symbol}")
    }
}
