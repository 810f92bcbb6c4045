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

//! Currency presentation.
//!
//! Amounts are displayed rounded to cents (`-$1,234.50`). Parsing accepts the
//! displayed form as well as plain numbers, so a value survives a
//! format-then-parse round trip to within one cent.

use crate::error::{LedgerError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Number of decimal places shown for money amounts.
pub const CURRENCY_PRECISION: u32 = 2;

/// Rounds `amount` to whole cents, half away from zero, always carrying two
/// decimal places (`0` becomes `0.00`).
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_PRECISION, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_PRECISION);
    rounded
}

/// Formats `amount` as dollars and cents with thousands separators.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = round_currency(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let digits = rounded.abs().to_string();
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{fraction}")
}

/// Parses a currency amount such as `"$1,000.50"`, `"-$3.10"` or `"42"`.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidCurrency`] when the text is not a number once
/// the sign, dollar sign, separators and surrounding whitespace are removed.
pub fn parse_currency(text: &str) -> Result<Decimal> {
    let invalid = || LedgerError::InvalidCurrency(text.to_string());

    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let body = body.strip_prefix('$').unwrap_or(body);
    let cleaned: String = body.chars().filter(|c| *c != ',').collect();

    if cleaned.is_empty() || cleaned.starts_with(['-', '+']) {
        return Err(invalid());
    }

    let value = Decimal::from_str(&cleaned).map_err(|_| invalid())?;
    Ok(if negative { -value } else { value })
}
