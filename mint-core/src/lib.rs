// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Mint eligibility and sequencing core.
//!
//! Flow: wallet change / read resolution / user input -> `MintSequencer` -> effects.
//! The sequencer never performs IO; the driver executes the returned effects and feeds
//! their outcomes back in as events.
pub mod allowlist;
pub mod claim;
pub mod field;
pub mod machine;
pub mod pricing;
pub mod view;

pub use allowlist::{Allowlist, AllowlistError};
pub use claim::{ClaimStatus, clamp_quantity, remaining};
pub use field::Field;
pub use machine::{
    ClaimBlocked, ClaimResolution, Effect, MintSequencer, ReadQuery, ReadResolution, Sequence,
};
pub use pricing::{PRICE_PLACEHOLDER, Price};
pub use view::{PortalView, SupplyView, ViewLabels};
