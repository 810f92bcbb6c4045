// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error types for ledger operations.

use crate::base::RecordId;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Referenced record ID does not exist
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// An initial advance is already recorded
    #[error("initial advance already set (record {0})")]
    AnchorExists(RecordId),

    /// The persistence backend failed
    #[error("storage backend failure: {0}")]
    Backend(#[from] BackendError),

    /// Text could not be read as a currency amount
    #[error("invalid currency amount: {0:?}")]
    InvalidCurrency(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// An amount left the representable decimal range
    #[error("amount out of range computing {0}")]
    Overflow(&'static str),
}

/// Persistence failures reported by a [`StorageBackend`](crate::StorageBackend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("i/o error: {0}")]
    Io(String),

    /// Stored data could not be decoded
    #[error("corrupt ledger data: {0}")]
    Corrupt(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Corrupt(err.to_string())
    }
}

/// Convenience `Result` type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
