//! Quality gate evaluation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::JobStep;

/// Rejection-rate threshold at or above which a batch is held for admin
/// review, as a fraction of the sample
pub fn default_hold_threshold() -> Decimal {
    Decimal::new(2, 1)
}

/// The two quality gates every produced batch passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcGate {
    /// After stitching; passing pushes a semi-finished lot
    Assembly,
    /// After packaging; passing books sellable finished goods
    Final,
}

impl QcGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcGate::Assembly => "Assembly QC",
            QcGate::Final => "Final QC",
        }
    }

    /// Gate a job is currently standing at, if any
    pub fn for_step(step: JobStep) -> Option<QcGate> {
        match step {
            JobStep::StitchingQcPending => Some(QcGate::Assembly),
            JobStep::FinalQcPending => Some(QcGate::Final),
            _ => None,
        }
    }

    /// Step a reworked batch restarts from after an admin rejects the hold
    /// but sends the pieces back to the floor instead of scrapping them
    pub fn rework_step(&self) -> JobStep {
        match self {
            QcGate::Assembly => JobStep::CuttingStarted,
            QcGate::Final => JobStep::PackagingStarted,
        }
    }
}

/// Result of evaluating a QC sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QcOutcome {
    /// Rejection rate at or above the threshold; batch held for review
    Hold { rejection_rate: Decimal },
    /// Batch proceeds; rejected pieces are deducted from the batch
    Pass { passed_qty: i32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QcError {
    #[error("{0}")]
    InvalidSample(&'static str),
}

/// Evaluate a QC sample against the hold threshold.
///
/// The rejection rate is `qty_rejected / sample_size`; a rate exactly at
/// the threshold holds the batch. On a pass, the sampled rejects are
/// extrapolated over nothing: only the physically rejected pieces come off
/// the batch.
pub fn evaluate_sample(
    total_qty: i32,
    sample_size: i32,
    qty_rejected: i32,
    hold_threshold: Decimal,
) -> Result<QcOutcome, QcError> {
    crate::validation::validate_qc_sample(total_qty, sample_size, qty_rejected)
        .map_err(QcError::InvalidSample)?;

    let rate = Decimal::from(qty_rejected) / Decimal::from(sample_size);
    if rate >= hold_threshold {
        return Ok(QcOutcome::Hold {
            rejection_rate: rate,
        });
    }
    Ok(QcOutcome::Pass {
        passed_qty: total_qty - qty_rejected,
    })
}

/// Admin decision on a held batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Override the hold; the batch proceeds as if it had passed
    Approve,
    /// Scrap the batch; the job terminates rejected
    Reject,
    /// Send the batch back to the floor for rework
    Rework,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "Approve",
            ReviewDecision::Reject => "Reject",
            ReviewDecision::Rework => "Rework",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Approve" => Some(ReviewDecision::Approve),
            "Reject" => Some(ReviewDecision::Reject),
            "Rework" => Some(ReviewDecision::Rework),
            _ => None,
        }
    }
}

/// Snapshot of an inspection stored on the job card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcSnapshot {
    pub gate: QcGate,
    pub sample_size: i32,
    pub qty_rejected: i32,
    pub passed_qty: i32,
    pub held: bool,
    pub notes: Option<String>,
    pub inspector: String,
    pub at: DateTime<Utc>,
}

/// Suffix appended to lot numbers booked through an admin override so the
/// pieces stay traceable downstream
pub const OVERRIDE_LOT_SUFFIX: &str = "-OVR";
