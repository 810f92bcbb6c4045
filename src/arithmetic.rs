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

//! Earnings and balance arithmetic.
//!
//! Negative booking counts are clamped to zero pay; every other input passes
//! through unchanged. The only failure is leaving the `Decimal` range, which
//! is reported as [`LedgerError::Overflow`] instead of panicking.

use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;

/// Commission earned for `bookings` at `per_booking_rate`.
///
/// Negative booking counts earn nothing. Fractional counts multiply normally.
pub fn booking_pay(bookings: Decimal, per_booking_rate: Decimal) -> Result<Decimal> {
    if bookings < Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    bookings
        .checked_mul(per_booking_rate)
        .ok_or(LedgerError::Overflow("booking pay"))
}

/// Sum of a day's pay components.
pub fn total_earnings(
    base_pay: Decimal,
    booking_pay: Decimal,
    inquiry_pay: Decimal,
) -> Result<Decimal> {
    base_pay
        .checked_add(booking_pay)
        .and_then(|sum| sum.checked_add(inquiry_pay))
        .ok_or(LedgerError::Overflow("total earnings"))
}

/// Balance after applying one day to `previous_remaining`.
///
/// With no advance drawn, earnings pay the outstanding balance down. When an
/// advance was drawn, the draw is subtracted and the earnings are added back.
pub fn balance_delta(
    previous_remaining: Decimal,
    advance_used_today: Decimal,
    total_earned_today: Decimal,
) -> Result<Decimal> {
    let remaining = if advance_used_today.is_zero() {
        previous_remaining.checked_sub(total_earned_today)
    } else {
        previous_remaining
            .checked_sub(advance_used_today)
            .and_then(|r| r.checked_add(total_earned_today))
    };
    remaining.ok_or(LedgerError::Overflow("remaining balance"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn booking_pay_multiplies_fractional_counts() {
        assert_eq!(booking_pay(dec!(2.5), dec!(40)), Ok(dec!(100.0)));
    }

    #[test]
    fn booking_pay_ignores_negative_counts() {
        assert_eq!(booking_pay(dec!(-1), dec!(40)), Ok(Decimal::ZERO));
        assert_eq!(booking_pay(dec!(-1), Decimal::MAX), Ok(Decimal::ZERO));
    }

    #[test]
    fn zero_advance_reduces_balance() {
        assert_eq!(balance_delta(dec!(1000), Decimal::ZERO, dec!(200)), Ok(dec!(800)));
    }

    #[test]
    fn advance_draw_applies_both_terms() {
        assert_eq!(balance_delta(dec!(1000), dec!(50), dec!(200)), Ok(dec!(1150)));
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!(
            booking_pay(Decimal::MAX, dec!(2)),
            Err(LedgerError::Overflow("booking pay"))
        );
        assert_eq!(
            total_earnings(Decimal::MAX, Decimal::ONE, Decimal::ZERO),
            Err(LedgerError::Overflow("total earnings"))
        );
        assert_eq!(
            balance_delta(Decimal::MIN, Decimal::ZERO, Decimal::ONE),
            Err(LedgerError::Overflow("remaining balance"))
        );
        assert_eq!(
            balance_delta(Decimal::ZERO, Decimal::MAX, Decimal::MAX),
            Ok(Decimal::ZERO)
        );
    }
}
