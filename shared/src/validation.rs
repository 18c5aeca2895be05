//! Validation utilities for the Garment Production Fulfillment Platform

use rust_decimal::Decimal;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a piece count is strictly positive
pub fn validate_piece_qty(qty: i32) -> Result<(), &'static str> {
    if qty <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a measured quantity (meters of fabric, kg of trims) is positive
pub fn validate_measured_qty(qty: Decimal) -> Result<(), &'static str> {
    if qty <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a percentage is in the 0-100 range
pub fn validate_percent(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO || value > Decimal::from(100) {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// Convert a quantity to a whole unit count. Fractional quantities and
/// quantities outside the i32 range are refused rather than truncated.
pub fn whole_units(qty: Decimal) -> Option<i32> {
    if !qty.is_integer() {
        return None;
    }
    use rust_decimal::prelude::ToPrimitive;
    qty.to_i32()
}

/// Validate a QC sample against the batch it was drawn from
pub fn validate_qc_sample(
    total_qty: i32,
    sample_size: i32,
    qty_rejected: i32,
) -> Result<(), &'static str> {
    if sample_size <= 0 {
        return Err("Sample size must be greater than zero");
    }
    if qty_rejected < 0 {
        return Err("Rejected quantity cannot be negative");
    }
    if qty_rejected > sample_size {
        return Err("Rejected quantity cannot exceed the sample size");
    }
    if sample_size > total_qty {
        return Err("Sample size cannot exceed the batch quantity");
    }
    Ok(())
}

/// Validate a physical receipt breakdown against the quantity being received.
/// Boxes times per-box plus loose pieces must account for the whole receipt.
pub fn validate_receipt_breakdown(
    received_qty: i32,
    no_of_boxes: i32,
    qty_per_box: i32,
    loose_qty: i32,
) -> Result<(), &'static str> {
    if no_of_boxes < 0 || qty_per_box < 0 || loose_qty < 0 {
        return Err("Breakdown counts cannot be negative");
    }
    if no_of_boxes > 0 && qty_per_box == 0 {
        return Err("Per-box quantity is required when boxes are declared");
    }
    if no_of_boxes * qty_per_box + loose_qty != received_qty {
        return Err("Box and loose breakdown must add up to the received quantity");
    }
    Ok(())
}

// ============================================================================
// Identifier Validations
// ============================================================================

/// Validate a lot number (uppercase alphanumeric with dashes, 3-32 chars)
pub fn validate_lot_number(lot: &str) -> Result<(), &'static str> {
    if lot.len() < 3 {
        return Err("Lot number must be at least 3 characters");
    }
    if lot.len() > 32 {
        return Err("Lot number must be at most 32 characters");
    }
    if !lot
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Lot number must be uppercase alphanumeric with dashes");
    }
    Ok(())
}

/// Validate an SKU code (3-20 uppercase alphanumeric, dashes allowed)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 3 {
        return Err("SKU must be at least 3 characters");
    }
    if sku.len() > 20 {
        return Err("SKU must be at most 20 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("SKU must be uppercase alphanumeric with dashes");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

// ============================================================================
// Planning Validations
// ============================================================================

/// Validate a set of plan splits: each split positive, total within the cap
pub fn validate_splits(split_quantities: &[i32], cap: i32) -> Result<(), &'static str> {
    if split_quantities.is_empty() {
        return Err("At least one split is required");
    }
    for &qty in split_quantities {
        if qty <= 0 {
            return Err("Split quantities must be greater than zero");
        }
    }
    let total: i64 = split_quantities.iter().map(|&q| q as i64).sum();
    if total > cap as i64 {
        return Err("Split quantities exceed the plannable ceiling");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_piece_qty() {
        assert!(validate_piece_qty(1).is_ok());
        assert!(validate_piece_qty(500).is_ok());
        assert!(validate_piece_qty(0).is_err());
        assert!(validate_piece_qty(-5).is_err());
    }

    #[test]
    fn test_validate_measured_qty() {
        assert!(validate_measured_qty(Decimal::new(25, 1)).is_ok());
        assert!(validate_measured_qty(Decimal::ZERO).is_err());
        assert!(validate_measured_qty(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_whole_units() {
        assert_eq!(whole_units(Decimal::from(480)), Some(480));
        assert_eq!(whole_units(Decimal::new(4805, 1)), None);
        assert_eq!(whole_units(Decimal::from(i64::from(i32::MAX) + 1)), None);
        assert_eq!(whole_units(Decimal::from(-3)), Some(-3));
    }

    #[test]
    fn test_validate_qc_sample_valid() {
        assert!(validate_qc_sample(100, 10, 2).is_ok());
        assert!(validate_qc_sample(100, 10, 0).is_ok());
        assert!(validate_qc_sample(100, 10, 10).is_ok());
    }

    #[test]
    fn test_validate_qc_sample_invalid() {
        assert!(validate_qc_sample(100, 0, 0).is_err());
        assert!(validate_qc_sample(100, 10, -1).is_err());
        assert!(validate_qc_sample(100, 10, 11).is_err());
        assert!(validate_qc_sample(5, 10, 1).is_err());
    }

    #[test]
    fn test_validate_receipt_breakdown() {
        // 4 boxes of 12 plus 2 loose = 50
        assert!(validate_receipt_breakdown(50, 4, 12, 2).is_ok());
        // All loose
        assert!(validate_receipt_breakdown(7, 0, 0, 7).is_ok());
        // Mismatched total
        assert!(validate_receipt_breakdown(50, 4, 12, 5).is_err());
        // Boxes declared without a per-box quantity
        assert!(validate_receipt_breakdown(10, 2, 0, 10).is_err());
        assert!(validate_receipt_breakdown(10, -1, 5, 15).is_err());
    }

    #[test]
    fn test_validate_lot_number() {
        assert!(validate_lot_number("FG-7F3A21").is_ok());
        assert!(validate_lot_number("SFG-7F3A21-OVR").is_ok());
        assert!(validate_lot_number("AB").is_err());
        assert!(validate_lot_number("fg-lowercase").is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("TSH-NAVY-M").is_ok());
        assert!(validate_sku("AB").is_err());
        assert!(validate_sku("bad sku").is_err());
    }

    #[test]
    fn test_validate_splits() {
        assert!(validate_splits(&[100, 200], 500).is_ok());
        assert!(validate_splits(&[], 500).is_err());
        assert!(validate_splits(&[100, 0], 500).is_err());
        assert!(validate_splits(&[300, 300], 500).is_err());
    }
}
