// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use alloy_primitives::Address;
use tokio::sync::watch;
use tracing::info;

/// The connected wallet, or `None` when disconnected.
///
/// Subscribers are only woken when the address actually changes.
#[derive(Debug, Clone)]
pub struct WalletSession {
    tx: watch::Sender<Option<Address>>,
}

impl WalletSession {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn current_address(&self) -> Option<Address> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Address>> {
        self.tx.subscribe()
    }

    pub fn connect(&self, address: Address) -> bool {
        let changed = self.set(Some(address));
        if changed {
            info!(wallet = %address, "wallet session connected");
        }
        changed
    }

    pub fn disconnect(&self) -> bool {
        let changed = self.set(None);
        if changed {
            info!("wallet session disconnected");
        }
        changed
    }

    fn set(&self, next: Option<Address>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        })
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}
