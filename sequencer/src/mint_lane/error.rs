// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MintLaneError {
    #[error("mint lane input channel closed")]
    ChannelClosed,
    #[error("wallet provider closed")]
    WalletProviderClosed,
    #[error("mint lane shutdown requested")]
    ShutdownRequested,
}
