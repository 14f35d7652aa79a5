// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod error;
mod handle;
mod lane;
mod profiling;
mod types;

pub use error::MintLaneError;
pub use handle::MintLaneHandle;
pub use lane::{MintLane, MintLaneConfig, MintLaneStop};
pub use types::{CommandError, CommandResult, MintCommand, MintLaneInput, PendingCommand};
