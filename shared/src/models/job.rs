//! Production job models and the canonical stage transition table

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Execution channel for a production job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobChannel {
    /// Made on our own shop floor
    InHouse,
    /// Stitched at an external job-work vendor, cut and packed in house
    JobWork,
    /// Bought fully finished from a trading vendor
    FullBuy,
}

impl JobChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobChannel::InHouse => "In-House",
            JobChannel::JobWork => "Job-Work",
            JobChannel::FullBuy => "Full-Buy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "In-House" => Some(JobChannel::InHouse),
            "Job-Work" => Some(JobChannel::JobWork),
            "Full-Buy" => Some(JobChannel::FullBuy),
            _ => None,
        }
    }

    /// Printable job-card prefix. Manual stock-build jobs carry their own
    /// prefix regardless of channel.
    pub fn id_prefix(&self, manual: bool) -> &'static str {
        if manual {
            return "MAN-STK";
        }
        match self {
            JobChannel::InHouse => "JC-IN",
            JobChannel::JobWork => "JC-JW",
            JobChannel::FullBuy => "TR-REQ",
        }
    }

    /// Step a freshly created job starts in. Full-Buy jobs wait on a
    /// purchase order; everything else waits on material issuance.
    pub fn initial_step(&self) -> JobStep {
        match self {
            JobChannel::FullBuy => JobStep::ProcurementPending,
            _ => JobStep::MaterialPending,
        }
    }
}

/// Coarse job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    QcPending,
    QcHold,
    ReadyForPacking,
    Completed,
    QcRejected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::InProgress => "In_Progress",
            JobStatus::QcPending => "QC_Pending",
            JobStatus::QcHold => "QC_Hold",
            JobStatus::ReadyForPacking => "Ready_For_Packing",
            JobStatus::Completed => "Completed",
            JobStatus::QcRejected => "QC_Rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(JobStatus::Pending),
            "In_Progress" => Some(JobStatus::InProgress),
            "QC_Pending" => Some(JobStatus::QcPending),
            "QC_Hold" => Some(JobStatus::QcHold),
            "Ready_For_Packing" => Some(JobStatus::ReadyForPacking),
            "Completed" => Some(JobStatus::Completed),
            "QC_Rejected" => Some(JobStatus::QcRejected),
            _ => None,
        }
    }

    /// Terminal statuses admit no further stage events
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::QcRejected)
    }
}

/// Fine-grained position of a job on the floor. Stage-completed markers
/// collapse into the next pending step so every persisted value is a state
/// a job can actually sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStep {
    /// Full-Buy only: waiting for a purchase order to be raised
    ProcurementPending,
    /// Full-Buy only: purchase order raised, goods inbound
    PoRaised,
    MaterialPending,
    CuttingPending,
    CuttingStarted,
    StitchingPending,
    SewingStarted,
    /// Job-work only: stitching done at the vendor, parcel in transit
    StitchingCompleted,
    /// Waiting on the assembly quality gate
    StitchingQcPending,
    PackagingPending,
    PackagingStarted,
    /// Waiting on the final quality gate
    FinalQcPending,
    /// Held for admin review after a failed gate
    QcReviewNeeded,
    QcCompleted,
    Scrapped,
}

impl JobStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStep::ProcurementPending => "Procurement_Pending",
            JobStep::PoRaised => "PO_Raised",
            JobStep::MaterialPending => "Material_Pending",
            JobStep::CuttingPending => "Cutting_Pending",
            JobStep::CuttingStarted => "Cutting_Started",
            JobStep::StitchingPending => "Stitching_Pending",
            JobStep::SewingStarted => "Sewing_Started",
            JobStep::StitchingCompleted => "Stitching_Completed",
            JobStep::StitchingQcPending => "Stitching_QC_Pending",
            JobStep::PackagingPending => "Packaging_Pending",
            JobStep::PackagingStarted => "Packaging_Started",
            JobStep::FinalQcPending => "Final_QC_Pending",
            JobStep::QcReviewNeeded => "QC_Review_Needed",
            JobStep::QcCompleted => "QC_Completed",
            JobStep::Scrapped => "Scrapped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Procurement_Pending" => Some(JobStep::ProcurementPending),
            "PO_Raised" => Some(JobStep::PoRaised),
            "Material_Pending" => Some(JobStep::MaterialPending),
            "Cutting_Pending" => Some(JobStep::CuttingPending),
            "Cutting_Started" => Some(JobStep::CuttingStarted),
            "Stitching_Pending" => Some(JobStep::StitchingPending),
            "Sewing_Started" => Some(JobStep::SewingStarted),
            "Stitching_Completed" => Some(JobStep::StitchingCompleted),
            "Stitching_QC_Pending" => Some(JobStep::StitchingQcPending),
            "Packaging_Pending" => Some(JobStep::PackagingPending),
            "Packaging_Started" => Some(JobStep::PackagingStarted),
            "Final_QC_Pending" => Some(JobStep::FinalQcPending),
            "QC_Review_Needed" => Some(JobStep::QcReviewNeeded),
            "QC_Completed" => Some(JobStep::QcCompleted),
            "Scrapped" => Some(JobStep::Scrapped),
            _ => None,
        }
    }
}

/// Where a job-work parcel physically is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogisticsStatus {
    AtSource,
    InTransit,
    ReceivedAtFactory,
}

impl LogisticsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogisticsStatus::AtSource => "At_Source",
            LogisticsStatus::InTransit => "In_Transit",
            LogisticsStatus::ReceivedAtFactory => "Received_At_Factory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "At_Source" => Some(LogisticsStatus::AtSource),
            "In_Transit" => Some(LogisticsStatus::InTransit),
            "Received_At_Factory" => Some(LogisticsStatus::ReceivedAtFactory),
            _ => None,
        }
    }
}

/// Shop-floor events reported against a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    CuttingStarted,
    CuttingCompleted,
    SewingStarted,
    StitchingCompleted,
    PackagingStarted,
    PackagingCompleted,
}

impl StageEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageEvent::CuttingStarted => "Cutting_Started",
            StageEvent::CuttingCompleted => "Cutting_Completed",
            StageEvent::SewingStarted => "Sewing_Started",
            StageEvent::StitchingCompleted => "Stitching_Completed",
            StageEvent::PackagingStarted => "Packaging_Started",
            StageEvent::PackagingCompleted => "Packaging_Completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Cutting_Started" => Some(StageEvent::CuttingStarted),
            "Cutting_Completed" => Some(StageEvent::CuttingCompleted),
            "Sewing_Started" => Some(StageEvent::SewingStarted),
            "Stitching_Completed" => Some(StageEvent::StitchingCompleted),
            "Packaging_Started" => Some(StageEvent::PackagingStarted),
            "Packaging_Completed" => Some(StageEvent::PackagingCompleted),
            _ => None,
        }
    }
}

/// Outcome of applying a stage event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next_step: JobStep,
    pub next_status: JobStatus,
    /// Job-work parcels leaving the vendor go into transit
    pub enters_transit: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("event {event} is not valid from step {step}")]
    InvalidEvent {
        step: &'static str,
        event: &'static str,
    },
    #[error("job is terminal and accepts no further events")]
    Terminal,
    #[error("parcel must be received at the factory before the assembly gate")]
    NotReceived,
    #[error("handshake only applies to job-work parcels in transit")]
    NotInTransit,
}

/// Canonical stage transition table.
///
/// Steps advance strictly one stage at a time; an event reported from the
/// wrong step fails and the job is untouched. Job-work stitching completes
/// into transit and holds there until [`receive_transition`] books the
/// parcel back in.
pub fn advance(
    channel: JobChannel,
    step: JobStep,
    status: JobStatus,
    event: StageEvent,
) -> Result<Transition, TransitionError> {
    if status.is_terminal() {
        return Err(TransitionError::Terminal);
    }
    let transition = match (step, event) {
        (JobStep::CuttingPending, StageEvent::CuttingStarted) => Transition {
            next_step: JobStep::CuttingStarted,
            next_status: JobStatus::InProgress,
            enters_transit: false,
        },
        (JobStep::CuttingStarted, StageEvent::CuttingCompleted) => Transition {
            next_step: JobStep::StitchingPending,
            next_status: JobStatus::InProgress,
            enters_transit: false,
        },
        (JobStep::StitchingPending, StageEvent::SewingStarted) => Transition {
            next_step: JobStep::SewingStarted,
            next_status: JobStatus::InProgress,
            enters_transit: false,
        },
        (JobStep::SewingStarted, StageEvent::StitchingCompleted) => match channel {
            JobChannel::JobWork => Transition {
                next_step: JobStep::StitchingCompleted,
                next_status: JobStatus::InProgress,
                enters_transit: true,
            },
            _ => Transition {
                next_step: JobStep::StitchingQcPending,
                next_status: JobStatus::QcPending,
                enters_transit: false,
            },
        },
        (JobStep::PackagingPending, StageEvent::PackagingStarted) => Transition {
            next_step: JobStep::PackagingStarted,
            next_status: JobStatus::InProgress,
            enters_transit: false,
        },
        (JobStep::PackagingStarted, StageEvent::PackagingCompleted) => Transition {
            next_step: JobStep::FinalQcPending,
            next_status: JobStatus::QcPending,
            enters_transit: false,
        },
        _ => {
            return Err(TransitionError::InvalidEvent {
                step: step.as_str(),
                event: event.as_str(),
            })
        }
    };
    Ok(transition)
}

/// Book a job-work parcel back into the factory. Only valid for a job-work
/// job whose stitching is complete and whose parcel is in transit; lands the
/// job at the assembly quality gate.
pub fn receive_transition(
    channel: JobChannel,
    step: JobStep,
    logistics: LogisticsStatus,
) -> Result<Transition, TransitionError> {
    if channel != JobChannel::JobWork
        || step != JobStep::StitchingCompleted
        || logistics != LogisticsStatus::InTransit
    {
        return Err(TransitionError::NotInTransit);
    }
    Ok(Transition {
        next_step: JobStep::StitchingQcPending,
        next_status: JobStatus::QcPending,
        enters_transit: false,
    })
}

/// Step a job lands in once its materials are issued
pub fn after_material_issue() -> Transition {
    Transition {
        next_step: JobStep::CuttingPending,
        next_status: JobStatus::InProgress,
        enters_transit: false,
    }
}

/// One entry of a job's audit history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: String,
    pub status: String,
    pub remarks: Option<String>,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// One entry of a job's stage timeline shown on the job card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub stage: String,
    pub action: String,
    pub details: Option<String>,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// A material draw charged to a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedMaterial {
    pub material_id: Uuid,
    pub material_name: String,
    pub lot_number: String,
    pub qty: Decimal,
    pub issued_by: String,
    pub at: DateTime<Utc>,
}

/// Per-stage execution mode on a job's routing card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    InHouse,
    JobWork,
}

/// Which party runs each stage of the job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingStep {
    pub mode: RoutingMode,
    pub vendor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routing {
    pub cutting: RoutingStep,
    pub stitching: RoutingStep,
    pub packing: RoutingStep,
}

/// Dispatch note for cut panels sent out to a job-work vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorDispatch {
    pub vendor_name: String,
    pub qty_sent: i32,
    /// Expected cutting wastage already deducted from the send
    pub wastage_percent: Decimal,
    pub transporter: Option<String>,
    pub dispatched_by: String,
    pub at: DateTime<Utc>,
}

/// Receipt log for a parcel booked back from a vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedLog {
    pub qty_received: i32,
    /// Sent minus received, flagged for vendor reconciliation
    pub discrepancy: i32,
    pub received_by: String,
    pub at: DateTime<Utc>,
}
