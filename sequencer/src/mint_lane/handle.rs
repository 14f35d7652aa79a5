// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::time::{Duration, Instant};

use alloy_primitives::Address;
use mint_core::PortalView;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot, watch};

use super::{CommandError, MintCommand, MintLaneInput, PendingCommand};

/// Cloneable front door to a running [`MintLane`](super::MintLane).
#[derive(Debug, Clone)]
pub struct MintLaneHandle {
    tx: mpsc::Sender<MintLaneInput>,
    views: watch::Receiver<PortalView>,
}

impl MintLaneHandle {
    pub fn new(tx: mpsc::Sender<MintLaneInput>, views: watch::Receiver<PortalView>) -> Self {
        Self { tx, views }
    }

    /// Latest published view.
    pub fn view(&self) -> PortalView {
        self.views.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PortalView> {
        self.views.clone()
    }

    /// Waits until the lane has applied a wallet change and returns the first view that
    /// shows `wallet`.
    pub async fn wait_for_wallet(
        &self,
        wallet: Option<Address>,
        timeout: Duration,
    ) -> Result<PortalView, CommandError> {
        let expected = wallet.map(|address| address.to_checksum(None));
        let mut views = self.views.clone();
        let waited = tokio::time::timeout(timeout, async move {
            views
                .wait_for(|view| view.wallet == expected)
                .await
                .map(|view| view.clone())
        })
        .await;
        match waited {
            Ok(Ok(view)) => Ok(view),
            Ok(Err(_)) => Err(CommandError::Unavailable),
            Err(_) => Err(CommandError::Overloaded),
        }
    }

    /// Enqueues `command` and waits for the view it produced.
    pub async fn execute(
        &self,
        command: MintCommand,
        queue_timeout: Duration,
    ) -> Result<PortalView, CommandError> {
        let (respond_to, recv) = oneshot::channel();
        let pending = PendingCommand {
            command,
            respond_to,
            received_at: Instant::now(),
        };
        match self
            .tx
            .send_timeout(MintLaneInput::Command(pending), queue_timeout)
            .await
        {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(CommandError::Overloaded),
            Err(SendTimeoutError::Closed(_)) => return Err(CommandError::Unavailable),
        }

        let result = recv.await.map_err(|_| CommandError::Unavailable)?;
        result.map_err(CommandError::from)
    }
}
