//! Invoice arithmetic.
//!
//! Every place that needs invoice figures (server-side recomputation on
//! write, the CLI invoice form, the export renderer) goes through
//! [`compute`]. Nothing else derives a subtotal, tax amount or total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Input ceilings. Within them no line, subtotal, tax or total can leave
/// `Decimal`'s range, so [`compute`] cannot overflow.
pub const MAX_QUANTITY: i64 = 1_000_000;
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
/// Percent.
pub const MAX_TAX_RATE: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
/// Ceiling for discount and tax amounts.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// The two inputs of a line that carry money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInput {
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl LineInput {
    pub fn new(quantity: i64, unit_price: Decimal) -> Self {
        Self { quantity, unit_price }
    }

    pub fn total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    /// One entry per input line, same order.
    pub line_totals: Vec<Decimal>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Compute line totals, subtotal, tax amount and grand total.
///
/// `tax_rate_percent` is a percentage (10 means 10%). The discount is an
/// absolute amount subtracted last. The total is not clamped: a discount
/// larger than subtotal plus tax gives a negative total.
pub fn compute(lines: &[LineInput], tax_rate_percent: Decimal, discount: Decimal) -> InvoiceTotals {
    let line_totals: Vec<Decimal> = lines.iter().map(LineInput::total).collect();
    let subtotal = line_totals.iter().copied().sum::<Decimal>();
    let tax_amount = subtotal * tax_rate_percent / Decimal::ONE_HUNDRED;
    let total = subtotal + tax_amount - discount;

    InvoiceTotals {
        line_totals,
        subtotal,
        tax_amount,
        total,
    }
}

/// Recover a tax percentage from an amount. Zero when there is no subtotal;
/// `None` when the implied rate is out of range or above [`MAX_TAX_RATE`].
pub fn tax_rate_from_amount(subtotal: Decimal, tax_amount: Decimal) -> Option<Decimal> {
    if subtotal.is_zero() {
        return Some(Decimal::ZERO);
    }
    let rate = tax_amount
        .checked_div(subtotal)?
        .checked_mul(Decimal::ONE_HUNDRED)?
        .normalize();
    (rate <= MAX_TAX_RATE).then_some(rate)
}
