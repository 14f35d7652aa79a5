// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::time::Instant;

use mint_core::{ClaimBlocked, ClaimResolution, PortalView, ReadResolution};
use thiserror::Error;
use tokio::sync::oneshot;

/// User-driven mutations of the portal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintCommand {
    SetQuantity(u64),
    IncrementQuantity,
    DecrementQuantity,
    SubmitClaim,
    ResetSequence,
    CheckEligibility,
}

pub type CommandResult = Result<PortalView, ClaimBlocked>;

#[derive(Debug)]
pub struct PendingCommand {
    pub command: MintCommand,
    pub respond_to: oneshot::Sender<CommandResult>,
    pub received_at: Instant,
}

#[derive(Debug)]
pub enum MintLaneInput {
    Command(PendingCommand),
}

/// Completions reported back to the lane by the tasks it spawned.
#[derive(Debug)]
pub(super) enum LaneEvent {
    Read(ReadResolution),
    Claim(ClaimResolution),
    TransitionElapsed(u64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Blocked(#[from] ClaimBlocked),
    #[error("mint lane queue full")]
    Overloaded,
    #[error("mint lane unavailable")]
    Unavailable,
}
