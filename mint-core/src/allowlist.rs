// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::HashMap;
use std::path::Path;

use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllowlistError {
    #[error("cannot read allowlist file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid allowlist JSON")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

/// Static `address -> allocation` table, loaded once at startup.
///
/// Keys are kept exactly as stored. Lookups by [`Address`] use the EIP-55 checksummed
/// form, so a key stored in another casing never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    allocations: HashMap<String, u64>,
}

impl Allowlist {
    pub fn new(allocations: HashMap<String, u64>) -> Self {
        Self { allocations }
    }

    /// Parses a JSON object of the form `{ "0xAbC...": 2, ... }`.
    pub fn from_json_str(json: &str) -> Result<Self, AllowlistError> {
        let allocations: HashMap<String, u64> =
            serde_json::from_str(json).map_err(|source| AllowlistError::Parse { source })?;
        Ok(Self::new(allocations))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AllowlistError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| AllowlistError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let allowlist = Self::from_json_str(raw.as_str())?;
        tracing::info!(
            path = %path.display(),
            entries = allowlist.len(),
            "allowlist loaded"
        );
        Ok(allowlist)
    }

    pub fn allocation_of(&self, wallet: &Address) -> u64 {
        self.allocation_of_str(wallet.to_checksum(None).as_str())
    }

    pub fn allocation_of_str(&self, wallet: &str) -> u64 {
        self.allocations.get(wallet).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

impl FromIterator<(String, u64)> for Allowlist {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
