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

//! # Earnings Ledger
//!
//! This library maintains a running "remaining" balance across date-ordered
//! daily earnings records, starting from an optional one-time initial advance
//! (the anchor record) or from a fallback balance in the settings.
//!
//! ## Core Components
//!
//! - [`LedgerStore`]: Recalculation engine; adds, edits and deletes records
//!   while keeping every balance consistent
//! - [`Record`]: One tracked day, or the single anchor record
//! - [`StorageBackend`]: Whole-set persistence ([`MemoryBackend`], [`JsonFileBackend`])
//! - [`arithmetic`]: Booking pay, total earnings and balance deltas
//! - [`LedgerError`]: Error types for ledger operations
//!
//! ## Example
//!
//! ```
//! use earnings_ledger::{LedgerStore, MemoryBackend, RecordDraft, RecordPatch};
//! use rust_decimal_macros::dec;
//!
//! let store = LedgerStore::new(MemoryBackend::new());
//! let day = |s: &str| -> chrono::NaiveDate { s.parse().unwrap() };
//!
//! store.create_anchor(dec!(1000), day("2024-01-01")).unwrap();
//! let a = store
//!     .add_record(RecordDraft::new(day("2024-01-02")).with_total_earnings(dec!(200)))
//!     .unwrap();
//! let b = store
//!     .add_record(RecordDraft::new(day("2024-01-03")).with_total_earnings(dec!(150)))
//!     .unwrap();
//! assert_eq!(b.remaining, dec!(650));
//!
//! // Editing an earlier day cascades to every later one.
//! let patch = RecordPatch { total_earnings: Some(dec!(300)), ..Default::default() };
//! store.update_record(a.id, patch).unwrap();
//! assert_eq!(store.get_record(b.id).unwrap().remaining, dec!(550));
//! ```
//!
//! ## Thread Safety
//!
//! The store serializes its own mutations, so it can be shared between
//! threads behind an `Arc`. It does not coordinate separate processes writing
//! to the same backend.

pub mod arithmetic;
mod base;
pub mod config;
pub mod currency;
pub mod error;
pub mod recalc;
mod record;
pub mod storage;
mod store;

pub use base::RecordId;
pub use config::{InsertPolicy, LedgerConfig, StoreConfig, load_config};
pub use currency::{format_currency, parse_currency};
pub use error::{BackendError, LedgerError};
pub use record::{Record, RecordDraft, RecordPatch, Settings};
pub use storage::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use store::LedgerStore;
