//! Inventory ledger tests
//!
//! Tests for lot-level stock tracking including:
//! - FIFO lot issuance ordering and conservation
//! - Insufficient stock leaving the ledger untouched
//! - Stock health banding against the reorder target

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    classify_health, issue_fifo, refill_to_target, reorder_target, total_lot_qty, HealthStatus,
    LedgerError, StockLot,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// Helper to create a lot received `offset_days` after a fixed epoch
fn lot(lot_number: &str, qty: &str, offset_days: i64) -> StockLot {
    StockLot {
        lot_number: lot_number.to_string(),
        qty: dec(qty),
        added_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset_days),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Oldest lot drains first, newer lots only touched when needed
    #[test]
    fn test_fifo_draws_oldest_first() {
        let mut lots = vec![
            lot("L-B", "50", 2),
            lot("L-A", "100", 0),
            lot("L-C", "75", 5),
        ];

        let draws = issue_fifo(&mut lots, dec("120")).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].lot_number, "L-A");
        assert_eq!(draws[0].qty_taken, dec("100"));
        assert_eq!(draws[1].lot_number, "L-B");
        assert_eq!(draws[1].qty_taken, dec("20"));

        // L-A is exhausted and removed, L-B partially drained
        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0].lot_number, "L-B");
        assert_eq!(lots[0].qty, dec("30"));
        assert_eq!(lots[1].lot_number, "L-C");
        assert_eq!(lots[1].qty, dec("75"));
    }

    /// Lot numbers may repeat within a material. Each touched lot still gets
    /// its own draw, in age order, so draws pair off positionally with the
    /// lots they came from.
    #[test]
    fn test_fifo_duplicate_lot_numbers_draw_per_lot() {
        let mut lots = vec![lot("L-1", "10", 0), lot("L-1", "5", 2)];

        let draws = issue_fifo(&mut lots, dec("12")).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].qty_taken, dec("10"));
        assert_eq!(draws[1].qty_taken, dec("2"));

        // Only the newer lot survives, with the undrawn remainder
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].qty, dec("3"));
        assert_eq!(lots[0].added_at, lot("L-1", "5", 2).added_at);
    }

    /// Lots received at the same instant keep their input order
    #[test]
    fn test_fifo_tied_timestamps_keep_input_order() {
        let mut lots = vec![lot("L-X", "4", 0), lot("L-Y", "4", 0)];

        let draws = issue_fifo(&mut lots, dec("6")).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].lot_number, "L-X");
        assert_eq!(draws[0].qty_taken, dec("4"));
        assert_eq!(draws[1].lot_number, "L-Y");
        assert_eq!(draws[1].qty_taken, dec("2"));
    }

    /// Issuing exactly one lot's quantity removes that lot
    #[test]
    fn test_fifo_exact_lot_boundary() {
        let mut lots = vec![lot("L-A", "40", 0), lot("L-B", "60", 1)];

        let draws = issue_fifo(&mut lots, dec("40")).unwrap();

        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].lot_number, "L-A");
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_number, "L-B");
    }

    /// Shortfall fails the whole issue and leaves every lot untouched
    #[test]
    fn test_insufficient_stock_rolls_back() {
        let mut lots = vec![lot("L-A", "30", 0), lot("L-B", "20", 1)];

        let err = issue_fifo(&mut lots, dec("51")).unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                requested: dec("51"),
                available: dec("50"),
            }
        );
        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0].qty, dec("30"));
        assert_eq!(lots[1].qty, dec("20"));
    }

    /// Zero or negative issue quantity is refused
    #[test]
    fn test_non_positive_issue_refused() {
        let mut lots = vec![lot("L-A", "30", 0)];

        assert_eq!(
            issue_fifo(&mut lots, Decimal::ZERO).unwrap_err(),
            LedgerError::NonPositiveQty
        );
        assert_eq!(
            issue_fifo(&mut lots, dec("-5")).unwrap_err(),
            LedgerError::NonPositiveQty
        );
    }

    /// Reorder target multiplies demand by lead time and safety factor
    #[test]
    fn test_reorder_target_arithmetic() {
        // 12 pieces/day * 10 days * 1.5 safety = 180
        assert_eq!(reorder_target(dec("12"), 10, dec("1.5")), dec("180"));

        // Safety multiplier below 1 is clamped to 1
        assert_eq!(reorder_target(dec("12"), 10, dec("0.5")), dec("120"));

        // Negative lead time behaves as zero
        assert_eq!(reorder_target(dec("12"), -3, dec("1.5")), Decimal::ZERO);
    }

    /// Health bands split at 33, 66 and 100 percent of target
    #[test]
    fn test_health_band_boundaries() {
        let target = dec("100");

        assert_eq!(classify_health(dec("0"), target), HealthStatus::Critical);
        assert_eq!(classify_health(dec("33"), target), HealthStatus::Critical);
        assert_eq!(classify_health(dec("33.01"), target), HealthStatus::Medium);
        assert_eq!(classify_health(dec("66"), target), HealthStatus::Medium);
        assert_eq!(classify_health(dec("66.01"), target), HealthStatus::Optimal);
        assert_eq!(classify_health(dec("100"), target), HealthStatus::Optimal);
        assert_eq!(classify_health(dec("100.01"), target), HealthStatus::Excess);
    }

    /// A zero target degenerates without dividing by zero
    #[test]
    fn test_health_with_zero_target() {
        assert_eq!(
            classify_health(dec("0"), Decimal::ZERO),
            HealthStatus::Critical
        );
        assert_eq!(
            classify_health(dec("500"), Decimal::ZERO),
            HealthStatus::Excess
        );
    }

    /// Refill quantity is the gap up to target, rounded up, never negative
    #[test]
    fn test_refill_to_target() {
        assert_eq!(refill_to_target(dec("180"), 100), 80);
        assert_eq!(refill_to_target(dec("180.4"), 100), 81);
        assert_eq!(refill_to_target(dec("180"), 180), 0);
        assert_eq!(refill_to_target(dec("180"), 300), 0);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn lots_strategy() -> impl Strategy<Value = Vec<StockLot>> {
    prop::collection::vec((1u32..=500, 0i64..=30), 1..8).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (qty, days))| lot(&format!("L-{i}"), &qty.to_string(), days))
            .collect()
    })
}

proptest! {
    /// Quantity is conserved: draws plus what remains equals what was there
    #[test]
    fn prop_fifo_conserves_quantity(mut lots in lots_strategy(), request in 1u32..=800) {
        let before = total_lot_qty(&lots);
        let request = Decimal::from(request);

        match issue_fifo(&mut lots, request) {
            Ok(draws) => {
                let drawn: Decimal = draws.iter().map(|d| d.qty_taken).sum();
                prop_assert_eq!(drawn, request);
                prop_assert_eq!(total_lot_qty(&lots) + drawn, before);
            }
            Err(LedgerError::InsufficientStock { requested, available }) => {
                prop_assert_eq!(requested, request);
                prop_assert_eq!(available, before);
                prop_assert_eq!(total_lot_qty(&lots), before);
            }
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }

    /// No lot ever goes negative and emptied lots are dropped
    #[test]
    fn prop_fifo_no_negative_lots(mut lots in lots_strategy(), request in 1u32..=800) {
        let _ = issue_fifo(&mut lots, Decimal::from(request));
        prop_assert!(lots.iter().all(|l| l.qty > Decimal::ZERO));
    }

    /// Draws come out in receipt order
    #[test]
    fn prop_fifo_respects_age_order(lots in lots_strategy(), request in 1u32..=800) {
        let original = lots.clone();
        let mut working = lots;

        if let Ok(draws) = issue_fifo(&mut working, Decimal::from(request)) {
            let added = |n: &str| {
                original
                    .iter()
                    .find(|l| l.lot_number == n)
                    .map(|l| l.added_at)
                    .unwrap()
            };
            for pair in draws.windows(2) {
                prop_assert!(added(&pair[0].lot_number) <= added(&pair[1].lot_number));
            }
        }
    }
}
