//! Quality gate tests
//!
//! Tests for sampled gate inspections including:
//! - Hold at exactly the threshold, pass just below it
//! - Sample validation bounds
//! - Gate placement and rework destinations

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    default_hold_threshold, evaluate_sample, validate_qc_sample, JobStep, QcGate, QcOutcome,
    ReviewDecision,
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

    /// A rejection rate exactly at the threshold holds the batch
    #[test]
    fn test_exact_threshold_holds() {
        // 4 of 20 sampled = 20%, default threshold 0.20
        let outcome = evaluate_sample(100, 20, 4, default_hold_threshold()).unwrap();
        assert!(matches!(
            outcome,
            QcOutcome::Hold { rejection_rate } if rejection_rate == dec("0.2")
        ));
    }

    /// Just below the threshold passes with the rejects deducted
    #[test]
    fn test_below_threshold_passes() {
        // 3 of 20 sampled = 15%
        let outcome = evaluate_sample(100, 20, 3, default_hold_threshold()).unwrap();
        assert_eq!(outcome, QcOutcome::Pass { passed_qty: 97 });
    }

    /// A clean sample passes the whole batch
    #[test]
    fn test_clean_sample_passes_everything() {
        let outcome = evaluate_sample(250, 25, 0, default_hold_threshold()).unwrap();
        assert_eq!(outcome, QcOutcome::Pass { passed_qty: 250 });
    }

    /// A custom threshold moves the hold boundary
    #[test]
    fn test_custom_threshold() {
        // 10% rejection with a 10% threshold holds
        assert!(matches!(
            evaluate_sample(100, 10, 1, dec("0.1")).unwrap(),
            QcOutcome::Hold { .. }
        ));
        // Same sample with a 20% threshold passes
        assert_eq!(
            evaluate_sample(100, 10, 1, dec("0.2")).unwrap(),
            QcOutcome::Pass { passed_qty: 99 }
        );
    }

    /// Sample bounds are enforced before any rate arithmetic
    #[test]
    fn test_sample_validation() {
        // Sample must be positive
        assert!(validate_qc_sample(100, 0, 0).is_err());
        // Rejects cannot be negative
        assert!(validate_qc_sample(100, 10, -1).is_err());
        // Rejects cannot exceed the sample
        assert!(validate_qc_sample(100, 10, 11).is_err());
        // Sample cannot exceed the batch
        assert!(validate_qc_sample(100, 101, 0).is_err());
        // Edges are valid
        assert!(validate_qc_sample(100, 100, 100).is_ok());
        assert!(validate_qc_sample(100, 1, 0).is_ok());
    }

    /// Invalid samples surface through evaluate_sample as errors
    #[test]
    fn test_evaluate_rejects_bad_sample() {
        assert!(evaluate_sample(100, 0, 0, default_hold_threshold()).is_err());
        assert!(evaluate_sample(100, 5, 6, default_hold_threshold()).is_err());
    }

    /// Gates sit at the two QC-pending steps and nowhere else
    #[test]
    fn test_gate_placement() {
        assert_eq!(
            QcGate::for_step(JobStep::StitchingQcPending),
            Some(QcGate::Assembly)
        );
        assert_eq!(QcGate::for_step(JobStep::FinalQcPending), Some(QcGate::Final));
        assert_eq!(QcGate::for_step(JobStep::CuttingStarted), None);
        assert_eq!(QcGate::for_step(JobStep::QcReviewNeeded), None);
    }

    /// Rework sends the batch back to the start of the failed stage
    #[test]
    fn test_rework_destinations() {
        assert_eq!(QcGate::Assembly.rework_step(), JobStep::CuttingStarted);
        assert_eq!(QcGate::Final.rework_step(), JobStep::PackagingStarted);
    }

    /// Review decisions round-trip their wire strings
    #[test]
    fn test_review_decision_round_trip() {
        for d in [
            ReviewDecision::Approve,
            ReviewDecision::Reject,
            ReviewDecision::Rework,
        ] {
            assert_eq!(ReviewDecision::from_str(d.as_str()), Some(d));
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Every valid sample either holds or passes, and a pass never exceeds
    /// the batch
    #[test]
    fn prop_outcome_is_total_and_bounded(
        total in 1i32..=5000,
        sample_frac in 1i32..=100,
        reject_frac in 0i32..=100,
    ) {
        let sample = (total * sample_frac / 100).max(1);
        let rejected = sample * reject_frac / 100;

        let outcome = evaluate_sample(total, sample, rejected, default_hold_threshold()).unwrap();
        match outcome {
            QcOutcome::Pass { passed_qty } => {
                prop_assert_eq!(passed_qty, total - rejected);
                prop_assert!(passed_qty <= total);
                prop_assert!(passed_qty >= 0);
            }
            QcOutcome::Hold { rejection_rate } => {
                prop_assert!(rejection_rate >= default_hold_threshold());
            }
        }
    }

    /// The hold boundary is exact: rate below threshold always passes
    #[test]
    fn prop_hold_iff_rate_at_or_above_threshold(
        sample in 1i32..=200,
        rejected_frac in 0i32..=100,
    ) {
        let rejected = sample * rejected_frac / 100;
        let rate = Decimal::from(rejected) / Decimal::from(sample);
        let threshold = default_hold_threshold();

        let outcome = evaluate_sample(sample, sample, rejected, threshold).unwrap();
        prop_assert_eq!(matches!(outcome, QcOutcome::Hold { .. }), rate >= threshold);
    }
}
