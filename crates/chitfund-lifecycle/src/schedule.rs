//! Derived chit fields: term end month and monthly contribution.
//!
//! Pure integer arithmetic, no I/O.

use chitfund_core::models::Paisa;
use chitfund_core::month::YearMonth;

use crate::error::LifecycleError;

/// Last month of a chit that starts in `start` and runs for `tenure`
/// months. A one-month chit ends in the month it starts.
pub fn calculate_end_month(start: YearMonth, tenure: u32) -> Result<YearMonth, LifecycleError> {
    if tenure == 0 {
        return Err(LifecycleError::ZeroTenure);
    }
    Ok(start.plus_months(i64::from(tenure) - 1)?)
}

/// Number of months in the inclusive span `start..=end`, or zero when
/// `end` precedes `start`.
pub fn tenure_months(start: YearMonth, end: YearMonth) -> u32 {
    u32::try_from(start.months_until(end) + 1).unwrap_or(0)
}

/// What each member pays per month: `fund / (members * tenure)`,
/// rounded down.
pub fn monthly_contribution(
    fund_amount: Paisa,
    member_count: u32,
    tenure: u32,
) -> Result<Paisa, LifecycleError> {
    let installments = i64::from(member_count) * i64::from(tenure);
    if installments == 0 {
        return Err(LifecycleError::DivisionInvalid);
    }
    Ok(fund_amount / installments)
}

/// Rounding slack left by [`monthly_contribution`]: how far the sum of
/// every installment falls short of the fund. Always in
/// `0..member_count * tenure` for a non-negative fund.
pub fn contribution_shortfall(
    fund_amount: Paisa,
    member_count: u32,
    tenure: u32,
) -> Result<Paisa, LifecycleError> {
    let installments = i64::from(member_count) * i64::from(tenure);
    let per_month = monthly_contribution(fund_amount, member_count, tenure)?;
    let collected = per_month
        .checked_mul(installments)
        .ok_or(LifecycleError::AmountOverflow)?;
    Ok(fund_amount - collected)
}
