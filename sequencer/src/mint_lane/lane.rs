// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy_primitives::Address;
use mint_core::{ClaimResolution, Effect, MintSequencer, ReadQuery, ReadResolution};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::profiling::MintLaneMetrics;
use super::types::LaneEvent;
use super::{MintCommand, MintLaneError, MintLaneInput, PendingCommand};
use crate::chain::{ChainReader, ChainWriter};
use mint_core::PortalView;

const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
pub struct MintLaneConfig {
    /// How often chain reads are re-polled.
    pub refresh_interval: Duration,
    pub metrics_enabled: bool,
    pub metrics_log_interval: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct MintLaneStop {
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl MintLaneStop {
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    async fn requested(&self) {
        while !self.is_shutdown_requested() {
            self.notify.notified().await;
        }
    }
}

/// Single owner of the [`MintSequencer`].
///
/// Wallet changes, user commands and effect completions are applied one at a time; effects
/// run as detached tasks that only report back through the lane's event channel.
pub struct MintLane<R: ChainReader, W: ChainWriter> {
    rx: mpsc::Receiver<MintLaneInput>,
    wallet_rx: watch::Receiver<Option<Address>>,
    events_tx: mpsc::UnboundedSender<LaneEvent>,
    events_rx: mpsc::UnboundedReceiver<LaneEvent>,
    views_tx: watch::Sender<PortalView>,
    stop: MintLaneStop,
    machine: MintSequencer,
    reader: Arc<R>,
    writer: Arc<W>,
    in_flight: HashSet<ReadQuery>,
    metrics: MintLaneMetrics,
    config: MintLaneConfig,
}

impl<R: ChainReader, W: ChainWriter> MintLane<R, W> {
    pub fn new(
        rx: mpsc::Receiver<MintLaneInput>,
        wallet_rx: watch::Receiver<Option<Address>>,
        machine: MintSequencer,
        reader: R,
        writer: W,
        config: MintLaneConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (views_tx, _views_rx) = watch::channel(machine.view());
        Self {
            rx,
            wallet_rx,
            events_tx,
            events_rx,
            views_tx,
            stop: MintLaneStop::default(),
            machine,
            reader: Arc::new(reader),
            writer: Arc::new(writer),
            in_flight: HashSet::new(),
            metrics: MintLaneMetrics::new(config.metrics_enabled, config.metrics_log_interval),
            config,
        }
    }

    pub fn views(&self) -> watch::Receiver<PortalView> {
        self.views_tx.subscribe()
    }

    pub fn spawn(self) -> (JoinHandle<MintLaneError>, MintLaneStop) {
        let stop = self.stop.clone();
        let handle = tokio::spawn(async move {
            let mut lane = self;
            let err = match lane.run_forever().await {
                Err(err) => err,
                Ok(never) => match never {},
            };
            lane.metrics.log_final();
            err
        });
        (handle, stop)
    }

    async fn run_forever(&mut self) -> Result<Infallible, MintLaneError> {
        let initial_wallet = *self.wallet_rx.borrow_and_update();
        let mut effects = self.machine.refresh();
        effects.extend(self.machine.on_wallet_changed(initial_wallet));
        self.run_effects(effects);
        self.publish_view();

        let mut ticker = tokio::time::interval(self.config.refresh_interval.max(MIN_REFRESH_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; startup already polled.
        ticker.tick().await;

        loop {
            self.metrics.on_loop(self.in_flight.len());
            let effects = tokio::select! {
                biased;
                () = self.stop.requested() => return Err(MintLaneError::ShutdownRequested),
                changed = self.wallet_rx.changed() => {
                    changed.map_err(|_| MintLaneError::WalletProviderClosed)?;
                    let wallet = *self.wallet_rx.borrow_and_update();
                    self.machine.on_wallet_changed(wallet)
                }
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                input = self.rx.recv() => match input {
                    Some(MintLaneInput::Command(pending)) => self.handle_command(pending),
                    None => return Err(MintLaneError::ChannelClosed),
                },
                _ = ticker.tick() => {
                    self.metrics.on_refresh();
                    self.machine.refresh()
                }
            };
            self.forget_abandoned_reads();
            self.run_effects(effects);
            self.publish_view();
            self.metrics.maybe_log_window();
        }
    }

    fn handle_command(&mut self, pending: PendingCommand) -> Vec<Effect> {
        let PendingCommand {
            command,
            respond_to,
            received_at,
        } = pending;
        self.metrics.on_command();

        let mut effects = Vec::new();
        let result = match command {
            MintCommand::SetQuantity(quantity) => {
                self.machine.set_quantity(quantity);
                Ok(())
            }
            MintCommand::IncrementQuantity => {
                self.machine.increment_quantity();
                Ok(())
            }
            MintCommand::DecrementQuantity => {
                self.machine.decrement_quantity();
                Ok(())
            }
            MintCommand::SubmitClaim => self.machine.submit_claim().map(|effect| {
                self.metrics.on_claim_submitted();
                effects.push(effect);
            }),
            MintCommand::ResetSequence => {
                effects = self.machine.reset_sequence();
                Ok(())
            }
            MintCommand::CheckEligibility => {
                effects = self.machine.check_eligibility();
                Ok(())
            }
        };

        if let Err(blocked) = &result {
            debug!(?command, %blocked, "command refused");
        }
        let _ = respond_to.send(result.map(|()| self.machine.view()));
        trace!(?command, elapsed = ?received_at.elapsed(), "command applied");
        effects
    }

    fn handle_event(&mut self, event: LaneEvent) -> Vec<Effect> {
        match event {
            LaneEvent::Read(resolution) => {
                self.in_flight.remove(&resolution.query());
                if !self.machine.is_current(&resolution) {
                    self.metrics.on_read_stale();
                } else if resolution.is_failure() {
                    self.metrics.on_read_failed();
                } else {
                    self.metrics.on_read_applied();
                }
                self.machine.on_read_resolved(resolution)
            }
            LaneEvent::Claim(resolution) => {
                self.metrics.on_claim_resolved(resolution.outcome.is_ok());
                self.machine.on_claim_resolved(resolution)
            }
            LaneEvent::TransitionElapsed(token) => {
                self.machine.on_transition_elapsed(token);
                Vec::new()
            }
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Read(query) => self.dispatch_read(query),
                Effect::Claim {
                    recipient,
                    quantity,
                } => self.dispatch_claim(recipient, quantity),
                Effect::EndTransition { token, after } => {
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = events.send(LaneEvent::TransitionElapsed(token));
                    });
                }
            }
        }
    }

    /// Stops tracking reads whose answer the machine would drop. Their tasks still finish,
    /// but a later query for the same session is dispatched afresh instead of coalesced.
    fn forget_abandoned_reads(&mut self) {
        let before = self.in_flight.len();
        self.in_flight
            .retain(|query| self.machine.is_query_current(query));
        let forgotten = before - self.in_flight.len();
        if forgotten > 0 {
            debug!(forgotten, "forgot in-flight reads for a previous session");
        }
    }

    fn dispatch_read(&mut self, query: ReadQuery) {
        if !self.in_flight.insert(query) {
            self.metrics.on_read_coalesced();
            return;
        }
        self.metrics.on_read_dispatched();

        let reader = Arc::clone(&self.reader);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let resolution = run_read(reader.as_ref(), query).await;
            let _ = events.send(LaneEvent::Read(resolution));
        });
    }

    fn dispatch_claim(&self, recipient: Address, quantity: u64) {
        let writer = Arc::clone(&self.writer);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = writer
                .claim(recipient, quantity)
                .await
                .map(|receipt| receipt.tx_hash)
                .map_err(|err| err.to_string());
            let _ = events.send(LaneEvent::Claim(ClaimResolution {
                recipient,
                quantity,
                outcome,
            }));
        });
    }

    fn publish_view(&self) {
        let view = self.machine.view();
        self.views_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}

async fn run_read<R: ChainReader>(reader: &R, query: ReadQuery) -> ReadResolution {
    match query {
        ReadQuery::ClaimConditionPrice => ReadResolution::ClaimConditionPrice(
            reader.claim_condition_price().await.map_err(|e| e.to_string()),
        ),
        ReadQuery::ActiveClaimConditionId => ReadResolution::ActiveClaimConditionId(
            reader
                .active_claim_condition_id()
                .await
                .map_err(|e| e.to_string()),
        ),
        ReadQuery::SupplyClaimedByWallet {
            condition_id,
            wallet,
        } => ReadResolution::SupplyClaimedByWallet {
            condition_id,
            wallet,
            outcome: reader
                .supply_claimed_by_wallet(condition_id, wallet)
                .await
                .map_err(|e| e.to_string()),
        },
        ReadQuery::TotalClaimedSupply => ReadResolution::TotalClaimedSupply(
            reader.total_claimed_supply().await.map_err(|e| e.to_string()),
        ),
        ReadQuery::NextTokenIdToMint => ReadResolution::NextTokenIdToMint(
            reader.next_token_id_to_mint().await.map_err(|e| e.to_string()),
        ),
        ReadQuery::ContractName => ReadResolution::ContractName(
            reader.contract_name().await.map_err(|e| e.to_string()),
        ),
    }
}
