//! Purchasing tests
//!
//! Tests for receipt arithmetic including:
//! - Net receipt value with discount and GST
//! - Box and loose breakdown validation
//! - Surplus recording and live remaining surplus

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    net_receipt_value, remaining_surplus, surplus_over, validate_receipt_breakdown,
    ReceiptBreakdown,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// GST applies on the discounted base, not the gross
    #[test]
    fn test_net_value_discount_then_gst() {
        // 100 pieces at 50, 10% discount, 5% GST
        // gross 5000, discounted 4500, with GST 4725
        assert_eq!(
            net_receipt_value(dec("100"), dec("50"), dec("10"), dec("5")),
            dec("4725.00")
        );
    }

    /// No discount and no GST leaves the gross untouched
    #[test]
    fn test_net_value_plain() {
        assert_eq!(
            net_receipt_value(dec("40"), dec("12.5"), Decimal::ZERO, Decimal::ZERO),
            dec("500.0")
        );
    }

    /// Discount-only and GST-only each apply alone
    #[test]
    fn test_net_value_single_adjustments() {
        assert_eq!(
            net_receipt_value(dec("10"), dec("100"), dec("25"), Decimal::ZERO),
            dec("750.00")
        );
        assert_eq!(
            net_receipt_value(dec("10"), dec("100"), Decimal::ZERO, dec("18")),
            dec("1180.00")
        );
    }

    /// Breakdown must reconcile boxes times per-box plus loose
    #[test]
    fn test_breakdown_reconciliation() {
        // 5 boxes of 12 plus 4 loose = 64
        assert!(validate_receipt_breakdown(64, 5, 12, 4).is_ok());
        assert!(validate_receipt_breakdown(65, 5, 12, 4).is_err());
        // Loose-only receipt
        assert!(validate_receipt_breakdown(7, 0, 0, 7).is_ok());
        // Boxes declared without a per-box quantity
        assert!(validate_receipt_breakdown(10, 2, 0, 10).is_err());
        // Negative components
        assert!(validate_receipt_breakdown(10, -1, 5, 15).is_err());
        assert!(validate_receipt_breakdown(10, 1, 5, -5).is_err());
    }

    /// Breakdown total matches its components
    #[test]
    fn test_breakdown_total() {
        let b = ReceiptBreakdown {
            no_of_boxes: 3,
            qty_per_box: 20,
            loose_qty: 7,
        };
        assert_eq!(b.total(), 67);
    }

    /// Surplus is only what exceeds the ordered quantity
    #[test]
    fn test_surplus_over() {
        assert_eq!(surplus_over(dec("100"), dec("110")), dec("10"));
        assert_eq!(surplus_over(dec("100"), dec("100")), Decimal::ZERO);
        assert_eq!(surplus_over(dec("100"), dec("90")), Decimal::ZERO);
    }

    /// Remaining surplus drains with the lot and never goes negative
    #[test]
    fn test_remaining_surplus() {
        // Lot still holds more than the surplus
        assert_eq!(remaining_surplus(dec("10"), dec("50")), dec("10"));
        // Lot drained below the surplus
        assert_eq!(remaining_surplus(dec("10"), dec("4")), dec("4"));
        // Lot fully consumed
        assert_eq!(remaining_surplus(dec("10"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(remaining_surplus(dec("10"), dec("-3")), Decimal::ZERO);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Net value scales linearly with quantity
    #[test]
    fn prop_net_value_linear_in_qty(
        qty in 1u32..1000,
        price in 1u32..500,
        disc in 0u32..=100,
        gst in 0u32..=28,
    ) {
        let qty = Decimal::from(qty);
        let price = Decimal::from(price);
        let disc = Decimal::from(disc);
        let gst = Decimal::from(gst);

        let unit = net_receipt_value(Decimal::ONE, price, disc, gst);
        let total = net_receipt_value(qty, price, disc, gst);
        prop_assert_eq!(total, unit * qty);
    }

    /// Net value is bounded by the gross with GST and never negative
    #[test]
    fn prop_net_value_bounds(
        qty in 1u32..1000,
        price in 1u32..500,
        disc in 0u32..=100,
        gst in 0u32..=28,
    ) {
        let qty = Decimal::from(qty);
        let price = Decimal::from(price);
        let gross_with_gst = qty * price * (Decimal::ONE + Decimal::from(gst) / Decimal::from(100));

        let net = net_receipt_value(qty, price, Decimal::from(disc), Decimal::from(gst));
        prop_assert!(net >= Decimal::ZERO);
        prop_assert!(net <= gross_with_gst);
    }

    /// A consistent breakdown always validates
    #[test]
    fn prop_consistent_breakdown_validates(
        boxes in 0i32..50,
        per_box in 1i32..100,
        loose in 0i32..100,
    ) {
        let total = boxes * per_box + loose;
        prop_assert!(validate_receipt_breakdown(total, boxes, per_box, loose).is_ok());
    }

    /// Remaining surplus never exceeds either input
    #[test]
    fn prop_remaining_surplus_bounds(surplus in 0u32..1000, lot in 0u32..1000) {
        let surplus = Decimal::from(surplus);
        let lot = Decimal::from(lot);
        let remaining = remaining_surplus(surplus, lot);

        prop_assert!(remaining <= surplus);
        prop_assert!(remaining <= lot);
        prop_assert!(remaining >= Decimal::ZERO);
    }
}
