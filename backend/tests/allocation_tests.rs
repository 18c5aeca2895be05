//! Allocation waterfall tests
//!
//! Tests for order stock allocation including:
//! - Ranking by priority weight then order age
//! - Displacement of earlier low-priority orders by later high-priority ones
//! - Pool conservation across reclaim and reallocation

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::{
    rank_for_allocation, reclaim_pool, run_waterfall, status_after_allocation,
    status_after_dispatch, AllocationLine, OrderStatus, Priority,
};

fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap() + Duration::days(offset)
}

fn line(priority: Priority, day_offset: i64, ordered: i32) -> AllocationLine {
    AllocationLine {
        order_item_id: Uuid::new_v4(),
        priority,
        order_created_at: day(day_offset),
        qty_ordered: ordered,
        qty_dispatched: 0,
        qty_allocated: 0,
        qty_to_produce: 0,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Priority weight wins; order age breaks ties
    #[test]
    fn test_ranking_order() {
        let mut lines = vec![
            line(Priority::Low, 0, 10),
            line(Priority::High, 5, 10),
            line(Priority::Medium, 2, 10),
            line(Priority::High, 1, 10),
        ];

        rank_for_allocation(&mut lines);

        assert_eq!(lines[0].priority, Priority::High);
        assert_eq!(lines[0].order_created_at, day(1));
        assert_eq!(lines[1].priority, Priority::High);
        assert_eq!(lines[1].order_created_at, day(5));
        assert_eq!(lines[2].priority, Priority::Medium);
        assert_eq!(lines[3].priority, Priority::Low);
    }

    /// A later high-priority order displaces an earlier low-priority one
    /// because the whole pool is reclaimed and re-ranked
    #[test]
    fn test_high_priority_displaces_earlier_low() {
        // The low order had the whole warehouse allocated
        let mut low = line(Priority::Low, 0, 80);
        low.qty_allocated = 80;
        let high = line(Priority::High, 3, 80);

        let mut lines = vec![low, high];
        let pool = reclaim_pool(20, &mut lines);
        assert_eq!(pool, 100);

        rank_for_allocation(&mut lines);
        let leftover = run_waterfall(pool, &mut lines);

        // High order (now ranked first) takes its full need
        assert_eq!(lines[0].priority, Priority::High);
        assert_eq!(lines[0].qty_allocated, 80);
        assert_eq!(lines[0].qty_to_produce, 0);

        // Low order is left with the remainder and a production backlog
        assert_eq!(lines[1].priority, Priority::Low);
        assert_eq!(lines[1].qty_allocated, 20);
        assert_eq!(lines[1].qty_to_produce, 60);
        assert_eq!(leftover, 0);
    }

    /// Dispatched quantity shrinks need; the waterfall only covers the rest
    #[test]
    fn test_dispatched_reduces_need() {
        let mut l = line(Priority::Medium, 0, 100);
        l.qty_dispatched = 40;

        let mut lines = vec![l];
        let leftover = run_waterfall(50, &mut lines);

        assert_eq!(lines[0].qty_allocated, 50);
        assert_eq!(lines[0].qty_to_produce, 10);
        assert_eq!(leftover, 0);
    }

    /// Surplus pool flows back to the warehouse after every need is met
    #[test]
    fn test_leftover_returns_to_warehouse() {
        let mut lines = vec![line(Priority::High, 0, 30), line(Priority::Low, 1, 20)];

        let leftover = run_waterfall(100, &mut lines);

        assert_eq!(lines[0].qty_allocated, 30);
        assert_eq!(lines[1].qty_allocated, 20);
        assert_eq!(leftover, 50);
    }

    /// Order status after allocation reflects whether every line is covered
    #[test]
    fn test_status_after_allocation() {
        let mut covered = line(Priority::High, 0, 10);
        covered.qty_allocated = 10;
        let mut short = line(Priority::Low, 1, 10);
        short.qty_allocated = 4;
        short.qty_to_produce = 6;

        assert_eq!(
            status_after_allocation(&[covered.clone()]),
            OrderStatus::ReadyDispatch
        );
        assert_eq!(
            status_after_allocation(&[covered, short]),
            OrderStatus::ProductionQueued
        );
    }

    /// Order status after dispatch distinguishes partial from complete
    #[test]
    fn test_status_after_dispatch() {
        let mut done = line(Priority::High, 0, 10);
        done.qty_dispatched = 10;
        let mut partial = line(Priority::High, 0, 10);
        partial.qty_dispatched = 3;

        assert_eq!(
            status_after_dispatch(&[done.clone()]),
            OrderStatus::Dispatched
        );
        assert_eq!(
            status_after_dispatch(&[done, partial]),
            OrderStatus::PartiallyDispatched
        );
    }

    /// Priority weights are strictly ordered
    #[test]
    fn test_priority_weights() {
        assert!(Priority::High.weight() > Priority::Medium.weight());
        assert!(Priority::Medium.weight() > Priority::Low.weight());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn lines_strategy() -> impl Strategy<Value = Vec<AllocationLine>> {
    prop::collection::vec(
        (0usize..3, 0i64..30, 1i32..200, 0i32..50, 0i32..100),
        1..10,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .map(|(p, d, ordered, dispatched, allocated)| {
                let priority = match p {
                    0 => Priority::Low,
                    1 => Priority::Medium,
                    _ => Priority::High,
                };
                let mut l = line(priority, d, ordered);
                l.qty_dispatched = dispatched.min(ordered);
                l.qty_allocated = allocated;
                l
            })
            .collect()
    })
}

proptest! {
    /// Reclaim then waterfall conserves the pool exactly
    #[test]
    fn prop_pool_conservation(mut lines in lines_strategy(), warehouse in 0i32..500) {
        let pool = reclaim_pool(warehouse, &mut lines);
        let reclaimed_total = pool;

        rank_for_allocation(&mut lines);
        let leftover = run_waterfall(pool, &mut lines);

        let allocated: i32 = lines.iter().map(|l| l.qty_allocated).sum();
        prop_assert_eq!(allocated + leftover, reclaimed_total);
        prop_assert!(leftover >= 0);
    }

    /// Every line ends with allocation plus backlog equal to its need
    #[test]
    fn prop_allocation_plus_backlog_equals_need(mut lines in lines_strategy(), warehouse in 0i32..500) {
        let pool = reclaim_pool(warehouse, &mut lines);
        rank_for_allocation(&mut lines);
        run_waterfall(pool, &mut lines);

        for l in &lines {
            prop_assert_eq!(l.qty_allocated + l.qty_to_produce, l.need());
            prop_assert!(l.qty_allocated >= 0);
            prop_assert!(l.qty_to_produce >= 0);
        }
    }

    /// No line short of stock while a lower-ranked line holds any: the
    /// waterfall is strictly greedy in rank order
    #[test]
    fn prop_greedy_in_rank_order(mut lines in lines_strategy(), warehouse in 0i32..500) {
        let pool = reclaim_pool(warehouse, &mut lines);
        rank_for_allocation(&mut lines);
        run_waterfall(pool, &mut lines);

        for i in 0..lines.len() {
            if lines[i].qty_to_produce > 0 {
                // Everything after a starved line got nothing
                for later in &lines[i + 1..] {
                    prop_assert_eq!(later.qty_allocated, 0);
                }
            }
        }
    }
}
