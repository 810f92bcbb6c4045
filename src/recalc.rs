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

//! Running-balance recalculation.
//!
//! Records are kept in stored (insertion) order; the balance chain runs over
//! a stable ascending sort by date, so same-date records chain in the order
//! they were inserted.
//!
//! ```text
//!   settings.advance_balance ──► r1 ──► r2 ──► r3        (no anchor)
//!
//!   anchor.remaining ─┬─► r0            (dated on/before the anchor)
//!                     └─► r2 ──► r3     (first record after the anchor
//!                                        with no earlier non-anchor record)
//! ```
//!
//! Every non-anchor record is stamped with
//! `balance_delta(opening, advance_used, total_earnings)`, where `opening` is:
//!
//! 1. the anchor amount, if the record is dated on or before the anchor;
//! 2. otherwise the `remaining` of the nearest preceding non-anchor record;
//! 3. otherwise the anchor amount, if an anchor exists;
//! 4. otherwise `settings.advance_balance`.
//!
//! The anchor's own `remaining` is never recomputed.

use crate::arithmetic::balance_delta;
use crate::base::RecordId;
use crate::error::Result;
use crate::record::{Record, Settings};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Indices into `records`, sorted by date ascending with ties in stored order.
pub(crate) fn chronological_order(records: &[Record]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    // `sort_by_key` is stable.
    order.sort_by_key(|&i| records[i].date);
    order
}

/// Position of stored index `index` within `order`.
pub(crate) fn position_of(order: &[usize], index: usize) -> usize {
    order.iter().position(|&i| i == index).unwrap_or(order.len())
}

pub(crate) fn find_anchor(records: &[Record]) -> Option<&Record> {
    records.iter().find(|r| r.is_initial_advance)
}

fn opening_balance(
    date: NaiveDate,
    previous: Option<Decimal>,
    anchor: Option<(NaiveDate, Decimal)>,
    settings: &Settings,
) -> Decimal {
    match (anchor, previous) {
        (Some((anchor_date, amount)), _) if date <= anchor_date => amount,
        (_, Some(previous)) => previous,
        (Some((_, amount)), None) => amount,
        (None, None) => settings.advance_balance,
    }
}

/// Restamps at most `limit` non-anchor records, starting at position `start`
/// of the chronological order. Returns the number of records whose
/// `remaining` changed.
///
/// On overflow the records before the failing one are already restamped;
/// callers discard the set.
fn restamp(
    records: &mut [Record],
    settings: &Settings,
    start: usize,
    limit: usize,
) -> Result<usize> {
    let order = chronological_order(records);
    let start = start.min(order.len());
    let anchor = find_anchor(records).map(|a| (a.date, a.remaining));

    let mut previous = order[..start]
        .iter()
        .rev()
        .map(|&i| &records[i])
        .find(|r| !r.is_initial_advance)
        .map(|r| r.remaining);

    let mut stamped = 0;
    let mut changed = 0;
    for &i in &order[start..] {
        if stamped == limit {
            break;
        }
        let record = &mut records[i];
        if record.is_initial_advance {
            continue;
        }

        let opening = opening_balance(record.date, previous, anchor, settings);
        let remaining = balance_delta(opening, record.advance_used, record.total_earnings)?;
        if record.remaining != remaining {
            record.remaining = remaining;
            changed += 1;
        }
        previous = Some(remaining);
        stamped += 1;
    }
    Ok(changed)
}

/// Restamps every non-anchor record from position `start` to the end of the
/// chronological order.
pub(crate) fn restamp_from(
    records: &mut [Record],
    settings: &Settings,
    start: usize,
) -> Result<usize> {
    restamp(records, settings, start, usize::MAX)
}

/// Stamps only the first non-anchor record at or after position `start`.
pub(crate) fn stamp_at(records: &mut [Record], settings: &Settings, start: usize) -> Result<usize> {
    restamp(records, settings, start, 1)
}

/// Recomputes every `remaining` from scratch. Returns the number of records
/// whose stored value changed.
pub fn recompute(records: &mut [Record], settings: &Settings) -> Result<usize> {
    restamp_from(records, settings, 0)
}

/// Ids of records whose stored `remaining` disagrees with a from-scratch
/// recomputation, in chronological order.
pub fn drift(records: &[Record], settings: &Settings) -> Result<Vec<RecordId>> {
    let mut expected = records.to_vec();
    recompute(&mut expected, settings)?;

    Ok(chronological_order(records)
        .into_iter()
        .filter(|&i| records[i].remaining != expected[i].remaining)
        .map(|i| records[i].id)
        .collect())
}

/// Balance after the chronologically last non-anchor record, falling back to
/// the anchor amount and then to the settings.
pub fn closing_balance(records: &[Record], settings: &Settings) -> Decimal {
    chronological_order(records)
        .into_iter()
        .rev()
        .map(|i| &records[i])
        .find(|r| !r.is_initial_advance)
        .or_else(|| find_anchor(records))
        .map(|r| r.remaining)
        .unwrap_or(settings.advance_balance)
}
