// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Mint portal service for an allowlisted ERC-721 drop.
//!
//! Flow: API / wallet session -> mint lane -> chain reader and writer.
//! The mint lane is the single writer of the portal state; every other task only
//! reports results back to it.
pub mod api;
pub mod chain;
pub mod mint_lane;
pub mod wallet;
