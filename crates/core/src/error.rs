// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error-kind taxonomy. Each crate wraps this in its own
//! `thiserror::Error` enum at its boundary rather than threading one giant
//! error type everywhere.

use thiserror::Error;

/// The eleven error kinds from the error-handling design. Carries a
/// human-readable `reason` and, where relevant, structured context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("resource insufficient: {0}")]
    ResourceInsufficient(String),

    #[error("dependency not ready: {0}")]
    DependencyNotReady(String),

    #[error("external failure: {0}")]
    ExternalFailure(String),

    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("integrity mismatch: {0}")]
    IntegrityMismatch(String),
}

impl CoreError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(reason.into())
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// `reason()` is the human-readable message carried by every variant,
    /// independent of its kind — used when surfacing the error verbatim to
    /// a user-triggered API caller.
    pub fn reason(&self) -> &str {
        match self {
            Self::NotFound(r)
            | Self::Duplicate(r)
            | Self::InvalidInput(r)
            | Self::InvalidState(r)
            | Self::PoolExhausted(r)
            | Self::ResourceInsufficient(r)
            | Self::DependencyNotReady(r)
            | Self::ExternalFailure(r)
            | Self::ConcurrentModification(r)
            | Self::TransactionFailed(r)
            | Self::IntegrityMismatch(r) => r,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
