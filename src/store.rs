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

//! Ledger store.
//!
//! The [`LedgerStore`] is the central component that owns the record set
//! through a [`StorageBackend`] and keeps every record's `remaining` balance
//! consistent with the chain described in [`crate::recalc`].
//!
//! # Operations
//!
//! - **Add**: stamps the new record from its predecessor, then (by default)
//!   restamps every later record.
//! - **Update**: merges a patch and restamps forward from the earlier of the
//!   record's old and new positions.
//! - **Delete**: removes a record and restamps everything that followed it.
//! - **Create anchor**: records the one-time initial advance.
//!
//! Each operation reads the whole set, computes the new set in memory and
//! persists it with a single `write_all`, so a failure leaves the stored
//! ledger untouched.
//!
//! # Thread Safety
//!
//! Mutations are serialized by an internal writer lock. Several threads can
//! share one store behind an `Arc`; separate processes pointed at the same
//! backend are not coordinated.

use crate::base::RecordId;
use crate::config::{InsertPolicy, StoreConfig};
use crate::error::{LedgerError, Result};
use crate::recalc::{self, chronological_order, find_anchor, position_of};
use crate::record::{Record, RecordDraft, RecordPatch, Settings};
use crate::storage::StorageBackend;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Running-balance ledger over a persistence backend.
///
/// # Invariants
///
/// - At most one record is the anchor (`is_initial_advance`).
/// - With [`InsertPolicy::Cascade`], recomputing every balance from scratch
///   after any operation reproduces the stored values exactly.
/// - The anchor's `remaining` is only ever set explicitly.
pub struct LedgerStore<B> {
    backend: B,
    config: StoreConfig,
    /// Held for the whole read-compute-write cycle of a mutation.
    writer: Mutex<()>,
}

impl<B: StorageBackend> LedgerStore<B> {
    /// Creates a store with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        LedgerStore {
            backend,
            config,
            writer: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Adds a day's record and returns it with its balance stamped.
    ///
    /// The opening balance is resolved against the current set. Under
    /// [`InsertPolicy::Cascade`] every record dated after the new one is
    /// restamped as well.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Backend`] - The backend read or write failed.
    /// - [`LedgerError::Overflow`] - A balance left the decimal range; nothing
    ///   is written.
    pub fn add_record(&self, draft: RecordDraft) -> Result<Record> {
        let _writer = self.writer.lock();
        let mut records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;

        let index = self.insert_draft(&mut records, &settings, draft)?;
        self.backend.write_all(&records)?;

        let record = records.swap_remove(index);
        info!(id = %record.id, date = %record.date, remaining = %record.remaining, "record added");
        Ok(record)
    }

    /// Adds several records in one atomic write.
    ///
    /// Drafts are inserted in the given order, each behaving as
    /// [`add_record`](Self::add_record) would.
    pub fn import_records(&self, drafts: Vec<RecordDraft>) -> Result<Vec<Record>> {
        let _writer = self.writer.lock();
        let mut records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;

        let indices = drafts
            .into_iter()
            .map(|draft| self.insert_draft(&mut records, &settings, draft))
            .collect::<Result<Vec<usize>>>()?;
        self.backend.write_all(&records)?;

        info!(count = indices.len(), "records imported");
        Ok(indices.into_iter().map(|i| records[i].clone()).collect())
    }

    /// Merges `patch` into record `id` and cascades the change.
    ///
    /// Restamping starts at the earlier of the record's old and new
    /// chronological positions, so records it moved past are re-chained too.
    /// Edits to the anchor's date or amount restamp the whole chain.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] - No record has this id.
    /// - [`LedgerError::Backend`] - The backend read or write failed.
    /// - [`LedgerError::Overflow`] - A balance left the decimal range; nothing
    ///   is written.
    pub fn update_record(&self, id: RecordId, patch: RecordPatch) -> Result<Record> {
        let _writer = self.writer.lock();
        let mut records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;

        let index = stored_index(&records, id)?;
        let old_position = position_of(&chronological_order(&records), index);

        let record = &mut records[index];
        if record.is_initial_advance && patch.touches_earnings() {
            warn!(id = %id, "ignoring earnings fields on the initial advance");
        }
        let is_anchor = record.is_initial_advance;
        let chain_changed = record.apply_patch(patch, settings.per_booking)?;

        let new_position = position_of(&chronological_order(&records), index);
        let start = if is_anchor && chain_changed {
            0
        } else {
            old_position.min(new_position)
        };
        let changed = recalc::restamp_from(&mut records, &settings, start)?;
        debug!(id = %id, start, changed, "cascade after update");

        self.backend.write_all(&records)?;

        let record = records.swap_remove(index);
        info!(id = %id, remaining = %record.remaining, "record updated");
        Ok(record)
    }

    /// Deletes record `id`, restamps everything after it, and returns the
    /// removed record.
    ///
    /// Deleting the anchor restamps every record from the settings fallback.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] - No record has this id.
    /// - [`LedgerError::Backend`] - The backend read or write failed.
    /// - [`LedgerError::Overflow`] - A balance left the decimal range; nothing
    ///   is written.
    pub fn delete_record(&self, id: RecordId) -> Result<Record> {
        let _writer = self.writer.lock();
        let mut records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;

        let index = stored_index(&records, id)?;
        let position = position_of(&chronological_order(&records), index);
        let removed = records.remove(index);

        let start = if removed.is_initial_advance { 0 } else { position };
        let changed = recalc::restamp_from(&mut records, &settings, start)?;
        debug!(id = %id, start, changed, "cascade after delete");

        self.backend.write_all(&records)?;
        info!(id = %id, anchor = removed.is_initial_advance, "record deleted");
        Ok(removed)
    }

    /// Records the one-time initial advance of `amount` on `date`.
    ///
    /// Under [`InsertPolicy::Cascade`] every existing record is restamped
    /// against the new anchor.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AnchorExists`] - An anchor is already recorded; it is
    ///   left unchanged.
    /// - [`LedgerError::Backend`] - The backend read or write failed.
    pub fn create_anchor(&self, amount: Decimal, date: NaiveDate) -> Result<Record> {
        let _writer = self.writer.lock();
        let mut records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;

        if let Some(existing) = find_anchor(&records) {
            warn!(existing = %existing.id, "initial advance already set");
            return Err(LedgerError::AnchorExists(existing.id));
        }

        let anchor = Record::anchor(next_id(&records), amount, date, Utc::now());
        records.push(anchor.clone());

        if self.config.insert_policy == InsertPolicy::Cascade {
            let changed = recalc::recompute(&mut records, &settings)?;
            debug!(changed, "chain restamped against new anchor");
        }

        self.backend.write_all(&records)?;
        info!(id = %anchor.id, amount = %amount, date = %date, "initial advance recorded");
        Ok(anchor)
    }

    /// All records, newest first.
    pub fn list_records(&self) -> Result<Vec<Record>> {
        let mut records = self.backend.read_all()?;
        let order = chronological_order(&records);

        let mut slots: Vec<Option<Record>> = records.drain(..).map(Some).collect();
        Ok(order
            .into_iter()
            .rev()
            .filter_map(|i| slots[i].take())
            .collect())
    }

    /// Looks up a record by id.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] - No record has this id.
    pub fn get_record(&self, id: RecordId) -> Result<Record> {
        let mut records = self.backend.read_all()?;
        let index = stored_index(&records, id)?;
        Ok(records.swap_remove(index))
    }

    /// The initial advance record, if one exists.
    pub fn anchor(&self) -> Result<Option<Record>> {
        let records = self.backend.read_all()?;
        Ok(find_anchor(&records).cloned())
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.backend.read_settings()?)
    }

    /// Replaces the settings.
    ///
    /// When no anchor exists and the fallback balance changes, the whole chain
    /// is restamped and written before the settings. If the settings write
    /// then fails, the previous records are written back.
    pub fn update_settings(&self, settings: Settings) -> Result<Settings> {
        let _writer = self.writer.lock();
        let previous = self.backend.read_settings()?;
        let original = self.backend.read_all()?;

        let rechain = find_anchor(&original).is_none()
            && previous.advance_balance != settings.advance_balance;

        if rechain {
            let mut records = original.clone();
            let changed = recalc::recompute(&mut records, &settings)?;
            debug!(changed, "chain restamped for new advance balance");
            self.backend.write_all(&records)?;
        }

        if let Err(err) = self.backend.write_settings(&settings) {
            if rechain {
                warn!(error = %err, "settings write failed, restoring records");
                self.backend.write_all(&original)?;
            }
            return Err(err.into());
        }

        info!(
            base_pay = %settings.base_pay,
            per_booking = %settings.per_booking,
            advance_balance = %settings.advance_balance,
            "settings updated"
        );
        Ok(settings)
    }

    /// Balance after the chronologically latest record.
    ///
    /// Holds the writer lock so records and settings are read as one state.
    pub fn current_balance(&self) -> Result<Decimal> {
        let _writer = self.writer.lock();
        let records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;
        Ok(recalc::closing_balance(&records, &settings))
    }

    /// Recomputes every balance from scratch and persists the result.
    ///
    /// Returns the number of records whose balance changed. Nothing is written
    /// when the ledger is already consistent.
    pub fn recalculate_all(&self) -> Result<usize> {
        let _writer = self.writer.lock();
        let mut records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;

        let changed = recalc::recompute(&mut records, &settings)?;
        if changed > 0 {
            warn!(changed, "repaired balance drift");
            self.backend.write_all(&records)?;
        }
        Ok(changed)
    }

    /// Ids of records whose stored balance disagrees with a full
    /// recomputation, oldest first.
    pub fn find_drift(&self) -> Result<Vec<RecordId>> {
        let _writer = self.writer.lock();
        let records = self.backend.read_all()?;
        let settings = self.backend.read_settings()?;
        recalc::drift(&records, &settings)
    }

    /// Appends `draft` to `records` and stamps it according to the insert
    /// policy. Returns the stored index of the new record.
    fn insert_draft(
        &self,
        records: &mut Vec<Record>,
        settings: &Settings,
        draft: RecordDraft,
    ) -> Result<usize> {
        let record = Record::from_draft(next_id(records), draft, Utc::now());
        let id = record.id;
        records.push(record);

        let index = records.len() - 1;
        let position = position_of(&chronological_order(records), index);
        let changed = match self.config.insert_policy {
            InsertPolicy::Cascade => recalc::restamp_from(records, settings, position)?,
            InsertPolicy::AppendOnly => recalc::stamp_at(records, settings, position)?,
        };
        debug!(id = %id, position, changed, "stamped new record");
        Ok(index)
    }
}

fn stored_index(records: &[Record], id: RecordId) -> Result<usize> {
    records
        .iter()
        .position(|r| r.id == id)
        .ok_or(LedgerError::NotFound(id))
}

fn next_id(records: &[Record]) -> RecordId {
    records
        .iter()
        .map(|r| r.id)
        .max()
        .map_or(RecordId(1), RecordId::next)
}
