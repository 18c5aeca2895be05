//! Production planning tests
//!
//! Tests for plan arithmetic including:
//! - The allocation ceiling with refill-to-target
//! - Split quantity validation against the ceiling
//! - Plan status after strategy confirmation

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    allocation_ceiling, refill_to_target, status_after_confirmation, validate_splits, PlanStatus,
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

    /// Ceiling covers the shortfall plus a warehouse refill up to target
    #[test]
    fn test_ceiling_with_refill() {
        // 100 to produce, 20 planned, 10 dispatched: shortfall 70.
        // Target 180 against 100 in the warehouse: refill 80.
        assert_eq!(allocation_ceiling(100, 20, 10, dec("180"), 100), 150);
    }

    /// A fully planned backlog still allows the refill portion
    #[test]
    fn test_ceiling_refill_only() {
        assert_eq!(allocation_ceiling(100, 100, 0, dec("180"), 100), 80);
    }

    /// Over-planned backlog never produces a negative shortfall
    #[test]
    fn test_ceiling_clamps_negative_shortfall() {
        assert_eq!(allocation_ceiling(50, 80, 0, dec("0"), 10), 0);
        assert_eq!(allocation_ceiling(50, 40, 20, dec("0"), 10), 0);
    }

    /// Warehouse at or above target contributes no refill
    #[test]
    fn test_ceiling_no_refill_above_target() {
        assert_eq!(allocation_ceiling(100, 0, 0, dec("180"), 200), 100);
        assert_eq!(allocation_ceiling(100, 0, 0, dec("180"), 180), 100);
    }

    /// Fractional targets round the refill up
    #[test]
    fn test_ceiling_rounds_refill_up() {
        assert_eq!(refill_to_target(dec("100.2"), 100), 1);
        assert_eq!(allocation_ceiling(0, 0, 0, dec("100.2"), 100), 1);
    }

    /// Splits must be positive and sum within the cap
    #[test]
    fn test_split_validation() {
        assert!(validate_splits(&[50, 30], 100).is_ok());
        assert!(validate_splits(&[50, 50], 100).is_ok());
        assert!(validate_splits(&[50, 51], 100).is_err());
        assert!(validate_splits(&[0, 10], 100).is_err());
        assert!(validate_splits(&[-5], 100).is_err());
        assert!(validate_splits(&[], 100).is_err());
    }

    /// Confirmation settles a plan into scheduled or partially planned
    #[test]
    fn test_status_after_confirmation() {
        assert_eq!(status_after_confirmation(100, 100), PlanStatus::Scheduled);
        assert_eq!(status_after_confirmation(150, 100), PlanStatus::Scheduled);
        assert_eq!(
            status_after_confirmation(60, 100),
            PlanStatus::PartiallyPlanned
        );
    }

    /// Plan status strings are stable wire values
    #[test]
    fn test_plan_status_strings() {
        assert_eq!(PlanStatus::PendingStrategy.as_str(), "Pending_Strategy");
        assert_eq!(PlanStatus::PartiallyPlanned.as_str(), "Partially_Planned");
        assert_eq!(PlanStatus::Scheduled.as_str(), "Scheduled");
        assert_eq!(PlanStatus::FulfilledByStock.as_str(), "Fulfilled_By_Stock");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// The ceiling is never negative and never below the refill portion
    #[test]
    fn prop_ceiling_bounds(
        to_produce in 0i32..1000,
        planned in 0i32..1000,
        dispatched in 0i32..1000,
        target in 0u32..2000,
        warehouse in 0i32..2000,
    ) {
        let target = Decimal::from(target);
        let ceiling = allocation_ceiling(to_produce, planned, dispatched, target, warehouse);
        let refill = refill_to_target(target, warehouse);

        prop_assert!(ceiling >= 0);
        prop_assert!(ceiling >= refill);
        prop_assert!(ceiling <= to_produce.max(0) + refill);
    }

    /// Splits summing within the ceiling always validate; one over never does
    #[test]
    fn prop_split_cap_is_exact(quantities in prop::collection::vec(1i32..100, 1..6)) {
        let total: i32 = quantities.iter().sum();

        prop_assert!(validate_splits(&quantities, total).is_ok());
        prop_assert!(validate_splits(&quantities, total - 1).is_err());
    }
}
