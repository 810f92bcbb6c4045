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

//! Ledger records and settings.
//!
//! A [`Record`] is either one tracked day of earnings or the single anchor
//! record (`is_initial_advance`) that fixes the starting balance. The anchor
//! carries no earnings and its `remaining` is the advance amount itself.

use crate::arithmetic::{booking_pay, total_earnings};
use crate::base::RecordId;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pay rates and the fallback starting balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Fixed inquiry pay earned every tracked day.
    pub base_pay: Decimal,
    /// Commission per booking.
    pub per_booking: Decimal,
    /// Starting balance used while no anchor record exists.
    pub advance_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub date: NaiveDate,
    pub base_pay: Decimal,
    pub bookings: Decimal,
    pub booking_pay: Decimal,
    pub inquiry_pay: Decimal,
    pub total_earnings: Decimal,
    pub advance_used: Decimal,
    /// Running balance after this record. Always derived by the store.
    pub remaining: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub is_initial_advance: bool,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub(crate) fn from_draft(id: RecordId, draft: RecordDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            date: draft.date,
            base_pay: draft.base_pay,
            bookings: draft.bookings,
            booking_pay: draft.booking_pay,
            inquiry_pay: draft.inquiry_pay,
            total_earnings: draft.total_earnings,
            advance_used: draft.advance_used,
            remaining: Decimal::ZERO,
            notes: draft.notes,
            action: draft.action,
            is_initial_advance: false,
            created_at,
        }
    }

    pub(crate) fn anchor(
        id: RecordId,
        amount: Decimal,
        date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            date,
            base_pay: Decimal::ZERO,
            bookings: Decimal::ZERO,
            booking_pay: Decimal::ZERO,
            inquiry_pay: Decimal::ZERO,
            total_earnings: Decimal::ZERO,
            advance_used: Decimal::ZERO,
            remaining: amount,
            notes: String::new(),
            action: String::new(),
            is_initial_advance: true,
            created_at,
        }
    }

    /// Merges `patch` into the record.
    ///
    /// Returns `true` if the patch changed anything the balance chain depends
    /// on. When bookings or base pay change without an explicit booking pay
    /// or total, booking pay is re-derived at `per_booking`. Whenever the pay
    /// components change without an explicit total, the total is re-derived
    /// from them.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`](crate::LedgerError::Overflow) - A derived
    ///   amount left the decimal range. The record may be partially patched.
    pub(crate) fn apply_patch(
        &mut self,
        patch: RecordPatch,
        per_booking: Decimal,
    ) -> Result<bool> {
        let before = (self.date, self.total_earnings, self.advance_used, self.remaining);

        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(action) = patch.action {
            self.action = action;
        }

        if self.is_initial_advance {
            if let Some(amount) = patch.anchor_amount {
                self.remaining = amount;
            }
        } else {
            let rederive_pay = (patch.bookings.is_some() || patch.base_pay.is_some())
                && patch.booking_pay.is_none()
                && patch.total_earnings.is_none();
            let retotal = patch.total_earnings.is_none()
                && (rederive_pay || patch.booking_pay.is_some());

            if let Some(base_pay) = patch.base_pay {
                self.base_pay = base_pay;
            }
            if let Some(bookings) = patch.bookings {
                self.bookings = bookings;
            }
            if let Some(pay) = patch.booking_pay {
                self.booking_pay = pay;
            }
            if let Some(inquiry_pay) = patch.inquiry_pay {
                self.inquiry_pay = inquiry_pay;
            }
            if let Some(advance_used) = patch.advance_used {
                self.advance_used = advance_used;
            }

            if rederive_pay {
                self.booking_pay = booking_pay(self.bookings, per_booking)?;
            }
            if retotal {
                self.total_earnings =
                    total_earnings(self.base_pay, self.booking_pay, Decimal::ZERO)?;
            } else if let Some(total) = patch.total_earnings {
                self.total_earnings = total;
            }
        }

        Ok(before != (self.date, self.total_earnings, self.advance_used, self.remaining))
    }
}

/// Input for a new (non-anchor) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub date: NaiveDate,
    #[serde(default)]
    pub base_pay: Decimal,
    #[serde(default)]
    pub bookings: Decimal,
    #[serde(default)]
    pub booking_pay: Decimal,
    #[serde(default)]
    pub inquiry_pay: Decimal,
    #[serde(default)]
    pub total_earnings: Decimal,
    #[serde(default)]
    pub advance_used: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub action: String,
}

impl RecordDraft {
    /// An empty day with every amount zero.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            base_pay: Decimal::ZERO,
            bookings: Decimal::ZERO,
            booking_pay: Decimal::ZERO,
            inquiry_pay: Decimal::ZERO,
            total_earnings: Decimal::ZERO,
            advance_used: Decimal::ZERO,
            notes: String::new(),
            action: String::new(),
        }
    }

    /// A day's earnings derived from the current settings.
    ///
    /// The settings base pay is snapshotted onto the record and restated as
    /// inquiry pay; the total is base pay plus booking pay.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`](crate::LedgerError::Overflow) - The derived
    ///   pay left the decimal range.
    pub fn for_day(date: NaiveDate, bookings: Decimal, settings: &Settings) -> Result<Self> {
        let pay = booking_pay(bookings, settings.per_booking)?;
        Ok(Self {
            base_pay: settings.base_pay,
            bookings,
            booking_pay: pay,
            inquiry_pay: settings.base_pay,
            total_earnings: total_earnings(settings.base_pay, pay, Decimal::ZERO)?,
            ..Self::new(date)
        })
    }

    pub fn with_total_earnings(mut self, total_earnings: Decimal) -> Self {
        self.total_earnings = total_earnings;
        self
    }

    pub fn with_advance_used(mut self, advance_used: Decimal) -> Self {
        self.advance_used = advance_used;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }
}

/// Partial update for an existing record. `None` leaves a field untouched.
///
/// Earnings fields are ignored for the anchor record; `anchor_amount` applies
/// only to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordPatch {
    pub date: Option<NaiveDate>,
    pub base_pay: Option<Decimal>,
    pub bookings: Option<Decimal>,
    pub booking_pay: Option<Decimal>,
    pub inquiry_pay: Option<Decimal>,
    pub total_earnings: Option<Decimal>,
    pub advance_used: Option<Decimal>,
    pub notes: Option<String>,
    pub action: Option<String>,
    pub anchor_amount: Option<Decimal>,
}

impl RecordPatch {
    /// Whether the patch sets any earnings field.
    pub(crate) fn touches_earnings(&self) -> bool {
        self.base_pay.is_some()
            || self.bookings.is_some()
            || self.booking_pay.is_some()
            || self.inquiry_pay.is_some()
            || self.total_earnings.is_some()
            || self.advance_used.is_some()
    }
}
