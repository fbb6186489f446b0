//! Amount arithmetic shared by funding, settlement and refunds
//!
//! All amounts are integer minor currency units. Every upward rounding in
//! the engine goes through [`ceil_to_unit`] so funding, settlement and
//! refund computations can never disagree on granularity.

/// VAT surcharge applied on top of the net escrow amount, in percent.
pub const VAT_RATE_PERCENT: i64 = 10;

/// Smallest tradable currency unit, in minor units.
pub const CURRENCY_UNIT: i64 = 1;

/// Round `amount` up to the next multiple of the smallest tradable unit.
pub fn ceil_to_unit(amount: i64) -> i64 {
    debug_assert!(amount >= 0, "amounts are never negative");
    let rem = amount % CURRENCY_UNIT;
    if rem == 0 {
        amount
    } else {
        amount + (CURRENCY_UNIT - rem)
    }
}

/// Gross up a net amount by the VAT surcharge, rounding up to the
/// smallest tradable unit.
pub fn vat_inclusive(net: i64) -> i64 {
    let gross = net * (100 + VAT_RATE_PERCENT);
    // Ceiling division by 100 before unit rounding.
    let gross = (gross + 99) / 100;
    ceil_to_unit(gross)
}

/// Total escrow amount for a slot: daily amount times guarantee count,
/// VAT inclusive.
pub fn escrow_total(daily_amount: i64, guarantee_count: i32) -> i64 {
    vat_inclusive(daily_amount * guarantee_count as i64)
}

/// Ceiling division used by the pro-rata buyer refund computation.
pub fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    debug_assert!(denominator > 0);
    (numerator + denominator - 1) / denominator
}
