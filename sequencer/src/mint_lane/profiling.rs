// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug)]
pub(super) struct MintLaneMetrics {
    enabled: bool,
    log_interval: Duration,
    window_started_at: Instant,
    loops: u64,
    commands: u64,
    refreshes: u64,
    reads_dispatched: u64,
    reads_coalesced: u64,
    reads_applied: u64,
    reads_failed: u64,
    reads_stale: u64,
    claims_submitted: u64,
    claims_confirmed: u64,
    claims_failed: u64,
    max_in_flight_reads: usize,
}

impl MintLaneMetrics {
    pub(super) fn new(enabled: bool, log_interval: Duration) -> Self {
        Self {
            enabled,
            log_interval,
            window_started_at: Instant::now(),
            loops: 0,
            commands: 0,
            refreshes: 0,
            reads_dispatched: 0,
            reads_coalesced: 0,
            reads_applied: 0,
            reads_failed: 0,
            reads_stale: 0,
            claims_submitted: 0,
            claims_confirmed: 0,
            claims_failed: 0,
            max_in_flight_reads: 0,
        }
    }

    pub(super) fn on_loop(&mut self, in_flight_reads: usize) {
        if !self.enabled {
            return;
        }
        self.loops = self.loops.saturating_add(1);
        self.max_in_flight_reads = self.max_in_flight_reads.max(in_flight_reads);
    }

    pub(super) fn on_command(&mut self) {
        bump(self.enabled, &mut self.commands);
    }

    pub(super) fn on_refresh(&mut self) {
        bump(self.enabled, &mut self.refreshes);
    }

    pub(super) fn on_read_dispatched(&mut self) {
        bump(self.enabled, &mut self.reads_dispatched);
    }

    pub(super) fn on_read_coalesced(&mut self) {
        bump(self.enabled, &mut self.reads_coalesced);
    }

    pub(super) fn on_read_applied(&mut self) {
        bump(self.enabled, &mut self.reads_applied);
    }

    pub(super) fn on_read_failed(&mut self) {
        bump(self.enabled, &mut self.reads_failed);
    }

    pub(super) fn on_read_stale(&mut self) {
        bump(self.enabled, &mut self.reads_stale);
    }

    pub(super) fn on_claim_submitted(&mut self) {
        bump(self.enabled, &mut self.claims_submitted);
    }

    pub(super) fn on_claim_resolved(&mut self, confirmed: bool) {
        if confirmed {
            bump(self.enabled, &mut self.claims_confirmed);
        } else {
            bump(self.enabled, &mut self.claims_failed);
        }
    }

    pub(super) fn maybe_log_window(&mut self) {
        if !self.enabled || self.window_started_at.elapsed() < self.log_interval {
            return;
        }
        self.log_window("mint lane metrics window");
        self.reset_window();
    }

    pub(super) fn log_final(&mut self) {
        if !self.enabled || self.loops == 0 {
            return;
        }
        self.log_window("mint lane metrics final");
        self.reset_window();
    }

    fn log_window(&self, message: &str) {
        let window = self.window_started_at.elapsed();
        info!(
            window_ms = window.as_millis() as u64,
            loops = self.loops,
            commands = self.commands,
            refreshes = self.refreshes,
            reads_dispatched = self.reads_dispatched,
            reads_coalesced = self.reads_coalesced,
            reads_applied = self.reads_applied,
            reads_failed = self.reads_failed,
            reads_stale = self.reads_stale,
            claims_submitted = self.claims_submitted,
            claims_confirmed = self.claims_confirmed,
            claims_failed = self.claims_failed,
            max_in_flight_reads = self.max_in_flight_reads,
            "{message}"
        );
    }

    fn reset_window(&mut self) {
        *self = Self::new(self.enabled, self.log_interval);
    }
}

fn bump(enabled: bool, counter: &mut u64) {
    if enabled {
        *counter = counter.saturating_add(1);
    }
}
