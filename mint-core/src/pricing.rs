// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::fmt;

use alloy_primitives::U256;
use alloy_primitives::utils::format_ether;
use serde::{Serialize, Serializer};

use crate::field::Field;

/// Text shown in place of a price that is not known yet.
pub const PRICE_PLACEHOLDER: &str = "--";

/// A native-token amount, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Price {
    pub wei: U256,
}

impl Price {
    pub const fn from_wei(wei: U256) -> Self {
        Self { wei }
    }

    /// Ether units at full 18-decimal precision.
    pub fn ether(&self) -> String {
        format_ether(self.wei)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ether().as_str())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr {
            wei: String,
            ether: String,
        }
        Repr {
            wei: self.wei.to_string(),
            ether: self.ether(),
        }
        .serialize(serializer)
    }
}

pub fn unit_price(price_per_unit: &Field<U256>) -> Field<Price> {
    price_per_unit.map(|wei| Price::from_wei(*wei))
}

pub fn total_price(price_per_unit: &Field<U256>, quantity: u64) -> Field<Price> {
    match price_per_unit {
        Field::Loading => Field::Loading,
        Field::Failed(reason) => Field::Failed(reason.clone()),
        Field::Ready(wei) => match checked_total(*wei, quantity) {
            Ok(total) => Field::Ready(total),
            Err(reason) => Field::Failed(reason),
        },
        Field::Stale { value, error } => match checked_total(*value, quantity) {
            Ok(total) => Field::Stale {
                value: total,
                error: error.clone(),
            },
            Err(reason) => Field::Failed(reason),
        },
    }
}

fn checked_total(wei: U256, quantity: u64) -> Result<Price, String> {
    wei.checked_mul(U256::from(quantity))
        .map(Price::from_wei)
        .ok_or_else(|| format!("total price overflows for quantity {quantity}"))
}
