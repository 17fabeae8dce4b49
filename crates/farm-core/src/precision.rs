//! Fixed-precision policy for reported figures.
//!
//! Sums are exact [`Decimal`] arithmetic and are never rounded. Quotients
//! (averages, rates of change) are rounded to [`REPORT_SCALE`] places with
//! banker's rounding. Sums and differences that leave the decimal range are
//! errors, never panics.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{FarmError, Result};

/// Decimal places kept on derived report values.
pub const REPORT_SCALE: u32 = 2;

/// Round a derived value to the report scale (midpoint to even).
pub fn round_report(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(REPORT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// `numerator / denominator` rounded to the report scale.
///
/// Returns `None` for a zero denominator instead of dividing.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator).map(round_report)
}

/// Like [`ratio`] but with a count as the denominator; zero yields zero.
pub fn mean(total: Decimal, count: usize) -> Decimal {
    ratio(total, Decimal::from(count)).unwrap_or(Decimal::ZERO)
}

/// Exact sum of `values`; `what` names the figure in the overflow error.
pub fn checked_total<I>(values: I, what: &str) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or_else(|| FarmError::overflow(what))
    })
}

/// Exact `later - earlier`.
pub fn checked_change(later: Decimal, earlier: Decimal, what: &str) -> Result<Decimal> {
    later
        .checked_sub(earlier)
        .ok_or_else(|| FarmError::overflow(what))
}
