// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::fmt;

use serde::Serialize;

/// Load state of one chain-backed value.
///
/// Unresolved data is never zero: a pending read stays `Loading` for as long as it takes.
/// A refresh that fails after a value was known keeps the value as `Stale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Field<T> {
    Loading,
    Ready(T),
    Stale { value: T, error: String },
    Failed(String),
}

impl<T> Field<T> {
    /// Last known value, fresh or stale.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) | Self::Stale { value, .. } => Some(value),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Error of the latest read, if it failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Stale { error, .. } | Self::Failed(error) => Some(error),
            Self::Loading | Self::Ready(_) => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> Field<U> {
        match self {
            Self::Loading => Field::Loading,
            Self::Ready(value) => Field::Ready(f(value)),
            Self::Stale { value, error } => Field::Stale {
                value: f(value),
                error: error.clone(),
            },
            Self::Failed(reason) => Field::Failed(reason.clone()),
        }
    }

    /// Applies a read outcome. A failure keeps a previously resolved value, marked stale.
    pub fn resolve(&mut self, outcome: Result<T, String>) {
        let error = match outcome {
            Ok(value) => {
                *self = Self::Ready(value);
                return;
            }
            Err(error) => error,
        };
        *self = match std::mem::replace(self, Self::Loading) {
            Self::Ready(value) | Self::Stale { value, .. } => Self::Stale { value, error },
            Self::Loading | Self::Failed(_) => Self::Failed(error),
        };
    }
}

impl<T: fmt::Display> Field<T> {
    pub fn display_or(&self, placeholder: &str) -> String {
        match self {
            Self::Ready(value) | Self::Stale { value, .. } => value.to_string(),
            Self::Loading | Self::Failed(_) => placeholder.to_string(),
        }
    }
}
