// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod effect;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::allowlist::Allowlist;
use crate::claim::{ClaimStatus, clamp_quantity, remaining};
use crate::field::Field;
use crate::pricing::{self, Price};
use crate::view::{PortalView, SupplyView, ViewLabels};

pub use effect::{ClaimBlocked, ClaimResolution, Effect, ReadQuery, ReadResolution};

/// Screen currently shown by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sequence {
    Initial,
    Allowlisted,
    NotAllowlisted,
    Minted,
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Allowlisted => "allowlisted",
            Self::NotAllowlisted => "not_allowlisted",
            Self::Minted => "minted",
        };
        f.write_str(name)
    }
}

/// Mint eligibility and sequencing state machine.
///
/// Every mutator returns the effects the driver must run. Chain data is derived state:
/// it is only ever written from [`ReadResolution`]s, and resolutions issued for a wallet
/// or claim condition that is no longer current are dropped.
#[derive(Debug)]
pub struct MintSequencer {
    allowlist: Arc<Allowlist>,
    currency_symbol: String,
    transition_debounce: Duration,

    wallet: Option<Address>,
    allocation: u64,
    condition_id: Field<U256>,
    claimed_by_wallet: Field<u64>,
    /// Lower bound on the claimed count from claims confirmed in this session.
    claimed_floor: u64,
    price_per_unit: Field<U256>,
    total_claimed_supply: Field<U256>,
    next_token_id: Field<U256>,
    contract_name: Field<String>,

    sequence: Sequence,
    quantity: u64,
    minted_amount: u64,
    claim: ClaimStatus,
    transition_token: u64,
    transitioning: bool,
}

impl MintSequencer {
    pub fn new(allowlist: Arc<Allowlist>, transition_debounce: Duration) -> Self {
        Self {
            allowlist,
            currency_symbol: String::new(),
            transition_debounce,
            wallet: None,
            allocation: 0,
            condition_id: Field::Loading,
            claimed_by_wallet: Field::Loading,
            claimed_floor: 0,
            price_per_unit: Field::Loading,
            total_claimed_supply: Field::Loading,
            next_token_id: Field::Loading,
            contract_name: Field::Loading,
            sequence: Sequence::Initial,
            quantity: 1,
            minted_amount: 0,
            claim: ClaimStatus::Idle,
            transition_token: 0,
            transitioning: false,
        }
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn wallet(&self) -> Option<Address> {
        self.wallet
    }

    pub fn allocation(&self) -> u64 {
        self.allocation
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn minted_amount(&self) -> u64 {
        self.minted_amount
    }

    pub fn claim_status(&self) -> &ClaimStatus {
        &self.claim
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// Reads polled on every refresh tick.
    pub fn refresh(&self) -> Vec<Effect> {
        let mut effects = vec![
            Effect::Read(ReadQuery::ClaimConditionPrice),
            Effect::Read(ReadQuery::ActiveClaimConditionId),
            Effect::Read(ReadQuery::TotalClaimedSupply),
            Effect::Read(ReadQuery::NextTokenIdToMint),
        ];
        // Metadata does not change once known.
        if !self.contract_name.is_ready() {
            effects.push(Effect::Read(ReadQuery::ContractName));
        }
        effects.extend(self.claimed_read());
        effects
    }

    pub fn remaining(&self) -> Field<u64> {
        if self.wallet.is_none() || self.allocation == 0 {
            return Field::Ready(0);
        }
        self.claimed_by_wallet
            .map(|claimed| remaining(self.allocation, *claimed))
    }

    pub fn unit_price(&self) -> Field<Price> {
        pricing::unit_price(&self.price_per_unit)
    }

    pub fn total_price(&self, quantity: u64) -> Field<Price> {
        pricing::total_price(&self.price_per_unit, quantity)
    }

    pub fn on_wallet_changed(&mut self, wallet: Option<Address>) -> Vec<Effect> {
        let mut effects = Vec::new();
        if wallet == self.wallet {
            return effects;
        }

        self.wallet = wallet;
        self.claimed_by_wallet = Field::Loading;
        self.claimed_floor = 0;
        self.quantity = 1;
        self.minted_amount = 0;
        self.claim = ClaimStatus::Idle;

        match wallet {
            None => {
                info!("wallet disconnected");
                self.allocation = 0;
                self.transition_to(Sequence::Initial, &mut effects);
            }
            Some(address) => {
                self.allocation = self.allowlist.allocation_of(&address);
                info!(wallet = %address, allocation = self.allocation, "wallet connected");
                // Until this wallet's claimed count resolves the portal shows the initial screen.
                self.transition_to(Sequence::Initial, &mut effects);
                self.evaluate_eligibility(&mut effects);
                effects.extend(self.claimed_read());
            }
        }
        effects
    }

    pub fn on_read_resolved(&mut self, resolution: ReadResolution) -> Vec<Effect> {
        let mut effects = Vec::new();
        match resolution {
            ReadResolution::ClaimConditionPrice(outcome) => {
                log_read_failure("claim condition price", &outcome);
                self.price_per_unit.resolve(outcome);
            }
            ReadResolution::ActiveClaimConditionId(outcome) => {
                self.apply_condition_id(outcome, &mut effects);
            }
            ReadResolution::SupplyClaimedByWallet {
                condition_id,
                wallet,
                outcome,
            } => {
                if !self.is_current_claim_read(condition_id, wallet) {
                    debug!(%wallet, %condition_id, "dropping claimed count for stale session");
                    return effects;
                }
                log_read_failure("supply claimed by wallet", &outcome);
                self.apply_claimed(outcome, &mut effects);
            }
            ReadResolution::TotalClaimedSupply(outcome) => {
                log_read_failure("total claimed supply", &outcome);
                self.total_claimed_supply.resolve(outcome);
            }
            ReadResolution::NextTokenIdToMint(outcome) => {
                log_read_failure("next token id to mint", &outcome);
                self.next_token_id.resolve(outcome);
            }
            ReadResolution::ContractName(outcome) => {
                log_read_failure("contract name", &outcome);
                self.contract_name.resolve(outcome);
            }
        }
        effects
    }

    /// True when a resolution would still be applied to the current session.
    pub fn is_current(&self, resolution: &ReadResolution) -> bool {
        match resolution {
            ReadResolution::SupplyClaimedByWallet {
                condition_id,
                wallet,
                ..
            } => self.is_current_claim_read(*condition_id, *wallet),
            _ => true,
        }
    }

    /// True when the answer to `query` would still be applied to the current session.
    pub fn is_query_current(&self, query: &ReadQuery) -> bool {
        match query {
            ReadQuery::SupplyClaimedByWallet {
                condition_id,
                wallet,
            } => self.is_current_claim_read(*condition_id, *wallet),
            _ => true,
        }
    }

    pub fn set_quantity(&mut self, requested: u64) {
        let remaining = self.remaining().ready().copied().unwrap_or(0);
        self.quantity = clamp_quantity(requested, remaining);
    }

    pub fn increment_quantity(&mut self) {
        self.set_quantity(self.quantity.saturating_add(1));
    }

    pub fn decrement_quantity(&mut self) {
        self.set_quantity(self.quantity.saturating_sub(1));
    }

    /// Why `submit_claim` would be refused right now, if it would.
    pub fn claim_blocker(&self) -> Option<ClaimBlocked> {
        if self.wallet.is_none() {
            return Some(ClaimBlocked::NoWallet);
        }
        if self.sequence != Sequence::Allowlisted {
            return Some(ClaimBlocked::NotMintable {
                sequence: self.sequence,
            });
        }
        if self.claim.is_pending() {
            return Some(ClaimBlocked::ClaimInFlight);
        }
        let Some(remaining) = self.remaining().ready().copied() else {
            return Some(ClaimBlocked::RemainingUnknown);
        };
        if remaining == 0 {
            return Some(ClaimBlocked::NothingRemaining);
        }
        if !(1..=remaining).contains(&self.quantity) {
            return Some(ClaimBlocked::QuantityOutOfRange {
                quantity: self.quantity,
                remaining,
            });
        }
        None
    }

    /// Validates and hands a claim for `(wallet, quantity)` to the writer. State is only
    /// touched when the claim goes out.
    pub fn submit_claim(&mut self) -> Result<Effect, ClaimBlocked> {
        if let Some(blocked) = self.claim_blocker() {
            return Err(blocked);
        }
        let Some(recipient) = self.wallet else {
            return Err(ClaimBlocked::NoWallet);
        };
        self.claim = ClaimStatus::Pending {
            quantity: self.quantity,
        };
        info!(%recipient, quantity = self.quantity, "claim submitted");
        Ok(Effect::Claim {
            recipient,
            quantity: self.quantity,
        })
    }

    pub fn on_claim_resolved(&mut self, resolution: ClaimResolution) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.wallet != Some(resolution.recipient) {
            warn!(
                recipient = %resolution.recipient,
                "dropping claim outcome for a wallet that is no longer connected"
            );
            return effects;
        }

        match resolution.outcome {
            Ok(tx_hash) => {
                info!(%tx_hash, quantity = resolution.quantity, "claim confirmed");
                self.minted_amount = resolution.quantity;
                self.claim = ClaimStatus::Confirmed { tx_hash };
                self.record_confirmed(resolution.quantity);
                self.transition_to(Sequence::Minted, &mut effects);
                effects.push(Effect::Read(ReadQuery::TotalClaimedSupply));
                effects.push(Effect::Read(ReadQuery::NextTokenIdToMint));
                effects.extend(self.claimed_read());
            }
            Err(reason) => {
                warn!(%reason, quantity = resolution.quantity, "claim failed");
                self.claim = ClaimStatus::Failed { reason };
            }
        }
        effects
    }

    pub fn reset_sequence(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.transition_to(Sequence::Initial, &mut effects);
        self.quantity = 1;
        self.minted_amount = 0;
        if !self.claim.is_pending() {
            self.claim = ClaimStatus::Idle;
        }
        effects
    }

    /// Re-runs the eligibility check from the initial screen for the connected wallet.
    pub fn check_eligibility(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.wallet.is_none() || self.sequence != Sequence::Initial {
            return effects;
        }
        self.evaluate_eligibility(&mut effects);
        effects.extend(self.claimed_read());
        effects
    }

    pub fn on_transition_elapsed(&mut self, token: u64) {
        if token == self.transition_token {
            self.transitioning = false;
        }
    }

    pub fn view(&self) -> PortalView {
        let remaining = self.remaining();
        let awaiting_eligibility = self.wallet.is_some()
            && self.sequence == Sequence::Initial
            && self.allocation > 0
            && self.claimed_by_wallet.is_loading();

        let is_loading = self.contract_name.is_loading() || awaiting_eligibility;
        let unit_price = self.unit_price();
        let total_price = self.total_price(self.quantity);
        let supply = SupplyView {
            claimed: self.total_claimed_supply.map(U256::to_string),
            total: self.next_token_id.map(U256::to_string),
        };
        let labels = ViewLabels::new(&unit_price, &total_price, &supply, &self.currency_symbol);

        PortalView {
            sequence: self.sequence,
            wallet: self.wallet.map(|address| address.to_checksum(None)),
            allocation: self.allocation,
            quantity: self.quantity,
            max_claimed: self.allocation > 0 && remaining.ready() == Some(&0),
            remaining,
            unit_price,
            total_price,
            minted_amount: self.minted_amount,
            supply,
            contract_name: self.contract_name.clone(),
            currency_symbol: self.currency_symbol.clone(),
            claim: self.claim.clone(),
            can_mint: self.claim_blocker().is_none(),
            is_loading,
            is_transitioning: self.transitioning,
            shows_loading: is_loading || self.transitioning,
            labels,
        }
    }

    fn claimed_read(&self) -> Option<Effect> {
        let wallet = self.wallet?;
        if self.allocation == 0 {
            return None;
        }
        let condition_id = *self.condition_id.ready()?;
        Some(Effect::Read(ReadQuery::SupplyClaimedByWallet {
            condition_id,
            wallet,
        }))
    }

    fn is_current_claim_read(&self, condition_id: U256, wallet: Address) -> bool {
        self.wallet == Some(wallet) && self.condition_id.ready() == Some(&condition_id)
    }

    fn apply_condition_id(&mut self, outcome: Result<U256, String>, effects: &mut Vec<Effect>) {
        log_read_failure("active claim condition id", &outcome);
        let previous = self.condition_id.ready().copied();
        if let Err(reason) = &outcome
            && previous.is_none()
        {
            // Without a condition id the per-wallet count cannot be asked for.
            self.claimed_by_wallet
                .resolve(Err(format!("claim condition unavailable: {reason}")));
        }
        self.condition_id.resolve(outcome);

        let current = self.condition_id.ready().copied();
        if current.is_some() && current != previous {
            if previous.is_some() {
                info!(?previous, ?current, "active claim condition changed");
            }
            // Claimed counts are tracked per condition.
            self.claimed_by_wallet = Field::Loading;
            self.claimed_floor = 0;
            effects.extend(self.claimed_read());
        }
    }

    /// Counts a confirmed claim before the chain reports it, so the allocation cannot be
    /// spent twice while the claimed read catches up.
    fn record_confirmed(&mut self, quantity: u64) {
        let known = self.claimed_by_wallet.ready().copied();
        let confirmed = known.unwrap_or(0).saturating_add(quantity);
        self.claimed_floor = self.claimed_floor.max(confirmed);
        if known.is_some() {
            self.claimed_by_wallet = Field::Ready(self.claimed_floor);
        }
        self.clamp_to_remaining();
    }

    fn apply_claimed(&mut self, outcome: Result<u64, String>, effects: &mut Vec<Effect>) {
        let floor = self.claimed_floor;
        let outcome = outcome.map(|claimed| {
            if claimed < floor {
                debug!(claimed, floor, "claimed count behind confirmed claims");
            }
            claimed.max(floor)
        });
        let previous = self.claimed_by_wallet.ready().copied();
        self.claimed_by_wallet.resolve(outcome);
        let current = self.claimed_by_wallet.ready().copied();
        if current.is_none() || current == previous {
            return;
        }

        self.clamp_to_remaining();
        // The confirmation screen stays up until the user leaves it.
        if self.sequence != Sequence::Minted {
            self.evaluate_eligibility(effects);
        }
    }

    fn evaluate_eligibility(&mut self, effects: &mut Vec<Effect>) {
        if self.wallet.is_none() {
            return;
        }
        let next = if self.allocation == 0 {
            Sequence::NotAllowlisted
        } else if self.claimed_by_wallet.ready().is_some() {
            Sequence::Allowlisted
        } else {
            return;
        };
        self.transition_to(next, effects);
    }

    fn clamp_to_remaining(&mut self) {
        if let Some(remaining) = self.remaining().ready().copied() {
            self.quantity = clamp_quantity(self.quantity, remaining);
        }
    }

    fn transition_to(&mut self, next: Sequence, effects: &mut Vec<Effect>) {
        if self.sequence == next {
            return;
        }
        debug!(from = %self.sequence, to = %next, "sequence transition");
        self.sequence = next;
        if self.transition_debounce.is_zero() {
            return;
        }
        self.transition_token = self.transition_token.wrapping_add(1);
        self.transitioning = true;
        effects.push(Effect::EndTransition {
            token: self.transition_token,
            after: self.transition_debounce,
        });
    }
}

fn log_read_failure<T>(what: &str, outcome: &Result<T, String>) {
    if let Err(reason) = outcome {
        warn!(read = what, %reason, "chain read failed");
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ClaimBlocked, ClaimResolution, Effect, MintSequencer, ReadQuery, ReadResolution, Sequence,
    };
    use crate::allowlist::Allowlist;
    use crate::claim::ClaimStatus;
    use crate::field::Field;
    use alloy_primitives::{Address, B256, U256};
    use std::sync::Arc;
    use std::time::Duration;

    const CONDITION: u64 = 0;

    fn wallet(seed: u8) -> Address {
        Address::from_slice(&[seed; 20])
    }

    fn holder() -> Address {
        wallet(0xaa)
    }

    fn stranger() -> Address {
        wallet(0xbb)
    }

    fn sequencer_with(entries: &[(Address, u64)], debounce: Duration) -> MintSequencer {
        let allowlist: Allowlist = entries
            .iter()
            .map(|(address, allocation)| (address.to_checksum(None), *allocation))
            .collect();
        let mut machine = MintSequencer::new(Arc::new(allowlist), debounce);
        machine.on_read_resolved(ReadResolution::ActiveClaimConditionId(Ok(U256::from(
            CONDITION,
        ))));
        machine
    }

    fn sequencer() -> MintSequencer {
        sequencer_with(&[(holder(), 2)], Duration::ZERO)
    }

    fn claimed(wallet: Address, count: u64) -> ReadResolution {
        ReadResolution::SupplyClaimedByWallet {
            condition_id: U256::from(CONDITION),
            wallet,
            outcome: Ok(count),
        }
    }

    fn connect_with_claimed(machine: &mut MintSequencer, address: Address, count: u64) {
        machine.on_wallet_changed(Some(address));
        machine.on_read_resolved(claimed(address, count));
    }

    fn confirm(machine: &mut MintSequencer, quantity: u64) -> Vec<Effect> {
        machine.on_claim_resolved(ClaimResolution {
            recipient: holder(),
            quantity,
            outcome: Ok(B256::repeat_byte(0x01)),
        })
    }

    #[test]
    fn allowlisted_wallet_reaches_mint_screen_once_claimed_resolves() {
        let mut machine = sequencer();

        let effects = machine.on_wallet_changed(Some(holder()));
        assert_eq!(machine.sequence(), Sequence::Initial);
        assert!(machine.view().is_loading);
        assert_eq!(
            effects,
            vec![Effect::Read(ReadQuery::SupplyClaimedByWallet {
                condition_id: U256::from(CONDITION),
                wallet: holder(),
            })]
        );

        machine.on_read_resolved(claimed(holder(), 0));
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        assert_eq!(machine.remaining(), Field::Ready(2));
        assert_eq!(machine.quantity(), 1);
        assert!(machine.view().can_mint);
    }

    #[test]
    fn wallet_outside_allowlist_is_not_allowlisted() {
        let mut machine = sequencer();

        let effects = machine.on_wallet_changed(Some(stranger()));
        assert_eq!(machine.sequence(), Sequence::NotAllowlisted);
        assert_eq!(machine.remaining(), Field::Ready(0));
        assert!(effects.is_empty(), "no claimed read for a zero allocation");
        assert_eq!(
            machine.claim_blocker(),
            Some(ClaimBlocked::NotMintable {
                sequence: Sequence::NotAllowlisted
            })
        );
    }

    #[test]
    fn exhausted_allocation_disables_mint_and_shows_notice() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 2);

        let view = machine.view();
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        assert_eq!(view.remaining, Field::Ready(0));
        assert!(!view.can_mint);
        assert!(view.max_claimed);
        assert_eq!(machine.submit_claim(), Err(ClaimBlocked::NothingRemaining));
    }

    #[test]
    fn over_claimed_wallet_has_zero_remaining() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 7);
        assert_eq!(machine.remaining(), Field::Ready(0));
    }

    #[test]
    fn set_quantity_clamps_into_bounds() {
        let mut machine = sequencer_with(&[(holder(), 5)], Duration::ZERO);
        connect_with_claimed(&mut machine, holder(), 1);

        for (requested, expected) in [(0, 1), (1, 1), (3, 3), (4, 4), (5, 4), (u64::MAX, 4)] {
            machine.set_quantity(requested);
            assert_eq!(machine.quantity(), expected, "requested {requested}");
        }

        machine.set_quantity(4);
        machine.increment_quantity();
        assert_eq!(machine.quantity(), 4);
        machine.set_quantity(1);
        machine.decrement_quantity();
        assert_eq!(machine.quantity(), 1);
    }

    #[test]
    fn shrinking_remaining_clamps_quantity_down_only() {
        let mut machine = sequencer_with(&[(holder(), 5)], Duration::ZERO);
        connect_with_claimed(&mut machine, holder(), 0);
        machine.set_quantity(4);

        machine.on_read_resolved(claimed(holder(), 3));
        assert_eq!(machine.quantity(), 2);

        machine.on_read_resolved(claimed(holder(), 1));
        assert_eq!(machine.quantity(), 2, "growing remaining never raises quantity");
    }

    #[test]
    fn disconnect_always_returns_to_initial() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);
        machine.submit_claim().expect("claim goes out");
        confirm(&mut machine, 1);
        assert_eq!(machine.sequence(), Sequence::Minted);

        machine.on_wallet_changed(None);
        assert_eq!(machine.sequence(), Sequence::Initial);
        assert_eq!(machine.remaining(), Field::Ready(0));
        assert_eq!(machine.minted_amount(), 0);
        assert_eq!(machine.claim_status(), &ClaimStatus::Idle);

        machine.on_wallet_changed(Some(stranger()));
        machine.on_wallet_changed(None);
        assert_eq!(machine.sequence(), Sequence::Initial);
    }

    #[test]
    fn confirmed_claim_moves_to_minted_then_reset_returns_to_initial() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);
        machine.set_quantity(2);

        let effect = machine.submit_claim().expect("claim goes out");
        assert_eq!(
            effect,
            Effect::Claim {
                recipient: holder(),
                quantity: 2
            }
        );
        assert_eq!(machine.submit_claim(), Err(ClaimBlocked::ClaimInFlight));

        let effects = confirm(&mut machine, 2);
        assert_eq!(machine.sequence(), Sequence::Minted);
        assert_eq!(machine.minted_amount(), 2);
        assert!(effects.contains(&Effect::Read(ReadQuery::TotalClaimedSupply)));

        // Refreshed claimed count does not leave the confirmation screen.
        machine.on_read_resolved(claimed(holder(), 2));
        assert_eq!(machine.sequence(), Sequence::Minted);

        machine.reset_sequence();
        assert_eq!(machine.sequence(), Sequence::Initial);
        assert_eq!(machine.quantity(), 1);
        assert_eq!(machine.minted_amount(), 0);
    }

    #[test]
    fn confirmed_claim_counts_against_allocation_before_refresh() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);
        machine.set_quantity(2);
        machine.submit_claim().expect("claim goes out");
        confirm(&mut machine, 2);
        assert_eq!(machine.remaining(), Field::Ready(0));

        machine.reset_sequence();
        machine.check_eligibility();
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        assert_eq!(machine.remaining(), Field::Ready(0));
        assert!(machine.view().max_claimed);
        assert!(!machine.view().can_mint);
        assert_eq!(machine.submit_claim(), Err(ClaimBlocked::NothingRemaining));

        // A read issued before the claim landed cannot give the allocation back.
        machine.on_read_resolved(claimed(holder(), 0));
        assert_eq!(machine.remaining(), Field::Ready(0));
        assert_eq!(machine.submit_claim(), Err(ClaimBlocked::NothingRemaining));

        machine.on_read_resolved(claimed(holder(), 2));
        assert_eq!(machine.remaining(), Field::Ready(0));
    }

    #[test]
    fn confirmed_claim_clamps_quantity_to_what_is_left() {
        let mut machine = sequencer_with(&[(holder(), 5)], Duration::ZERO);
        connect_with_claimed(&mut machine, holder(), 0);
        machine.set_quantity(3);
        machine.submit_claim().expect("claim goes out");
        confirm(&mut machine, 3);
        machine.reset_sequence();
        machine.check_eligibility();

        assert_eq!(machine.remaining(), Field::Ready(2));
        machine.set_quantity(4);
        assert_eq!(machine.quantity(), 2);
        assert!(machine.submit_claim().is_ok());
    }

    #[test]
    fn confirmed_floor_resets_for_next_wallet() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);
        machine.submit_claim().expect("claim goes out");
        confirm(&mut machine, 2);

        machine.on_wallet_changed(None);
        connect_with_claimed(&mut machine, holder(), 0);
        assert_eq!(
            machine.remaining(),
            Field::Ready(2),
            "a new session trusts the chain again"
        );
    }

    #[test]
    fn failed_claim_keeps_mint_screen_and_allows_retry() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);
        machine.submit_claim().expect("claim goes out");

        machine.on_claim_resolved(ClaimResolution {
            recipient: holder(),
            quantity: 1,
            outcome: Err("execution reverted".to_string()),
        });
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        assert_eq!(
            machine.claim_status(),
            &ClaimStatus::Failed {
                reason: "execution reverted".to_string()
            }
        );
        assert!(machine.submit_claim().is_ok(), "retry is always possible");
    }

    #[test]
    fn reset_from_not_allowlisted_returns_to_initial() {
        let mut machine = sequencer();
        machine.on_wallet_changed(Some(stranger()));
        machine.set_quantity(3);

        machine.reset_sequence();
        assert_eq!(machine.sequence(), Sequence::Initial);
        assert_eq!(machine.quantity(), 1);
        assert_eq!(machine.minted_amount(), 0);

        machine.check_eligibility();
        assert_eq!(machine.sequence(), Sequence::NotAllowlisted);
    }

    #[test]
    fn check_eligibility_after_reset_reenters_mint_screen() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);
        machine.submit_claim().expect("claim goes out");
        confirm(&mut machine, 1);
        machine.on_read_resolved(claimed(holder(), 1));
        machine.reset_sequence();

        let effects = machine.check_eligibility();
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        assert_eq!(machine.remaining(), Field::Ready(1));
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::Read(ReadQuery::SupplyClaimedByWallet { .. })
        )));
    }

    #[test]
    fn stale_wallet_reads_are_discarded() {
        let mut machine = sequencer_with(&[(holder(), 2), (wallet(0xcc), 3)], Duration::ZERO);
        machine.on_wallet_changed(Some(holder()));
        machine.on_wallet_changed(Some(wallet(0xcc)));

        let late = claimed(holder(), 0);
        assert!(!machine.is_current(&late));
        assert!(!machine.is_query_current(&late.query()));
        assert!(machine.is_query_current(&ReadQuery::SupplyClaimedByWallet {
            condition_id: U256::from(CONDITION),
            wallet: wallet(0xcc),
        }));
        machine.on_read_resolved(late);
        assert_eq!(machine.sequence(), Sequence::Initial);
        assert_eq!(machine.remaining(), Field::Loading);

        machine.on_read_resolved(claimed(wallet(0xcc), 1));
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        assert_eq!(machine.remaining(), Field::Ready(2));
    }

    #[test]
    fn claim_outcome_for_previous_wallet_is_discarded() {
        let mut machine = sequencer_with(&[(holder(), 2), (wallet(0xcc), 3)], Duration::ZERO);
        connect_with_claimed(&mut machine, holder(), 0);
        machine.submit_claim().expect("claim goes out");
        connect_with_claimed(&mut machine, wallet(0xcc), 0);

        confirm(&mut machine, 1);
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        assert_eq!(machine.minted_amount(), 0);
    }

    #[test]
    fn condition_change_invalidates_claimed_count() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 2);
        assert_eq!(machine.remaining(), Field::Ready(0));

        let effects = machine.on_read_resolved(ReadResolution::ActiveClaimConditionId(Ok(
            U256::from(1_u64),
        )));
        assert_eq!(machine.remaining(), Field::Loading);
        assert_eq!(
            effects,
            vec![Effect::Read(ReadQuery::SupplyClaimedByWallet {
                condition_id: U256::from(1_u64),
                wallet: holder(),
            })]
        );

        // Old-condition count arriving late is ignored.
        machine.on_read_resolved(claimed(holder(), 2));
        assert_eq!(machine.remaining(), Field::Loading);

        machine.on_read_resolved(ReadResolution::SupplyClaimedByWallet {
            condition_id: U256::from(1_u64),
            wallet: holder(),
            outcome: Ok(0),
        });
        assert_eq!(machine.remaining(), Field::Ready(2));
    }

    #[test]
    fn partial_data_renders_per_field() {
        let mut machine = sequencer();
        machine.on_read_resolved(ReadResolution::ClaimConditionPrice(Ok(U256::from(10_u64))));
        machine.on_read_resolved(ReadResolution::TotalClaimedSupply(Err(
            "rpc down".to_string()
        )));

        let view = machine.view();
        assert!(view.unit_price.is_ready());
        assert_eq!(view.supply.claimed, Field::Failed("rpc down".to_string()));
        assert_eq!(view.supply.total, Field::Loading);
        assert_eq!(view.sequence, Sequence::Initial);
    }

    #[test]
    fn read_failure_does_not_change_sequence() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);

        machine.on_read_resolved(ReadResolution::SupplyClaimedByWallet {
            condition_id: U256::from(CONDITION),
            wallet: holder(),
            outcome: Err("timeout".to_string()),
        });
        assert_eq!(machine.sequence(), Sequence::Allowlisted);
        let remaining = machine.remaining();
        assert_eq!(remaining.ready(), Some(&2), "last known count is kept");
        assert!(remaining.is_stale());
        assert_eq!(remaining.error(), Some("timeout"));
        assert!(machine.view().can_mint);
    }

    #[test]
    fn transition_debounce_raises_flag_until_latest_token_elapses() {
        let mut machine = sequencer_with(&[(holder(), 2)], Duration::from_millis(300));
        machine.on_wallet_changed(Some(holder()));
        let effects = machine.on_read_resolved(claimed(holder(), 0));

        let token = match effects.as_slice() {
            [Effect::EndTransition { token, after }] => {
                assert_eq!(*after, Duration::from_millis(300));
                *token
            }
            other => panic!("expected one transition effect, got {other:?}"),
        };
        assert!(machine.view().is_transitioning);
        assert_eq!(machine.sequence(), Sequence::Allowlisted);

        machine.on_transition_elapsed(token.wrapping_sub(1));
        assert!(machine.is_transitioning(), "older timers do not clear the flag");
        machine.on_transition_elapsed(token);
        assert!(!machine.is_transitioning());
    }

    #[test]
    fn refresh_polls_wallet_read_only_when_known() {
        let mut machine = sequencer();
        assert!(
            !machine
                .refresh()
                .iter()
                .any(|effect| matches!(effect, Effect::Read(ReadQuery::SupplyClaimedByWallet { .. })))
        );

        machine.on_wallet_changed(Some(holder()));
        assert!(machine.refresh().contains(&Effect::Read(
            ReadQuery::SupplyClaimedByWallet {
                condition_id: U256::from(CONDITION),
                wallet: holder(),
            }
        )));

        machine.on_read_resolved(ReadResolution::ContractName(Ok("Jungle".to_string())));
        assert!(!machine.refresh().contains(&Effect::Read(ReadQuery::ContractName)));
    }

    #[test]
    fn total_price_follows_quantity() {
        let mut machine = sequencer();
        connect_with_claimed(&mut machine, holder(), 0);
        assert!(machine.view().total_price.is_loading());

        machine.on_read_resolved(ReadResolution::ClaimConditionPrice(Ok(U256::from(5_u64))));
        machine.set_quantity(2);
        let view = machine.view();
        assert_eq!(
            view.total_price.ready().map(|price| price.wei),
            Some(U256::from(10_u64))
        );
    }
}
