use rust_decimal::Decimal;
use validator::ValidationError;

/// Largest amount a `DECIMAL(12, 2)` money column can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Money inputs are non-negative, at most two decimal places and within
/// [`MAX_AMOUNT`].
pub fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("more_than_two_decimal_places"));
    }
    if *value > MAX_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// `unit_price × quantity`, or `None` when the product does not fit.
pub fn line_amount(unit_price: Decimal, quantity: i32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}
