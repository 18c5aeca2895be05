//! Job card state machine tests
//!
//! Tests for the canonical stage transition table including:
//! - Full happy paths for in-house and job-work channels
//! - Invalid events failing without side effects
//! - Terminal statuses rejecting every event
//! - The job-work transit handshake

use proptest::prelude::*;

use shared::{
    advance, after_material_issue, receive_transition, JobChannel, JobStatus, JobStep,
    LogisticsStatus, StageEvent, TransitionError,
};

const ALL_EVENTS: [StageEvent; 6] = [
    StageEvent::CuttingStarted,
    StageEvent::CuttingCompleted,
    StageEvent::SewingStarted,
    StageEvent::StitchingCompleted,
    StageEvent::PackagingStarted,
    StageEvent::PackagingCompleted,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// In-house jobs walk cutting, stitching and packaging into the gates
    #[test]
    fn test_in_house_happy_path() {
        let channel = JobChannel::InHouse;
        let mut step = after_material_issue().next_step;
        let mut status = after_material_issue().next_status;
        assert_eq!(step, JobStep::CuttingPending);
        assert_eq!(status, JobStatus::InProgress);

        let path = [
            (StageEvent::CuttingStarted, JobStep::CuttingStarted),
            (StageEvent::CuttingCompleted, JobStep::StitchingPending),
            (StageEvent::SewingStarted, JobStep::SewingStarted),
            (StageEvent::StitchingCompleted, JobStep::StitchingQcPending),
        ];
        for (event, expected) in path {
            let t = advance(channel, step, status, event).unwrap();
            assert_eq!(t.next_step, expected);
            assert!(!t.enters_transit);
            step = t.next_step;
            status = t.next_status;
        }
        assert_eq!(status, JobStatus::QcPending);

        // After the assembly gate passes the job stands at packaging
        step = JobStep::PackagingPending;
        status = JobStatus::ReadyForPacking;

        let t = advance(channel, step, status, StageEvent::PackagingStarted).unwrap();
        assert_eq!(t.next_step, JobStep::PackagingStarted);
        let t = advance(channel, t.next_step, t.next_status, StageEvent::PackagingCompleted)
            .unwrap();
        assert_eq!(t.next_step, JobStep::FinalQcPending);
        assert_eq!(t.next_status, JobStatus::QcPending);
    }

    /// Job-work stitching completion enters transit instead of the gate
    #[test]
    fn test_job_work_enters_transit() {
        let t = advance(
            JobChannel::JobWork,
            JobStep::SewingStarted,
            JobStatus::InProgress,
            StageEvent::StitchingCompleted,
        )
        .unwrap();

        assert_eq!(t.next_step, JobStep::StitchingCompleted);
        assert_eq!(t.next_status, JobStatus::InProgress);
        assert!(t.enters_transit);
    }

    /// Receiving the parcel lands the job at the assembly gate
    #[test]
    fn test_receive_parcel_handshake() {
        let t = receive_transition(
            JobChannel::JobWork,
            JobStep::StitchingCompleted,
            LogisticsStatus::InTransit,
        )
        .unwrap();

        assert_eq!(t.next_step, JobStep::StitchingQcPending);
        assert_eq!(t.next_status, JobStatus::QcPending);
    }

    /// The handshake refuses anything not actually in transit
    #[test]
    fn test_receive_guards() {
        // Wrong channel
        assert_eq!(
            receive_transition(
                JobChannel::InHouse,
                JobStep::StitchingCompleted,
                LogisticsStatus::InTransit,
            )
            .unwrap_err(),
            TransitionError::NotInTransit
        );
        // Wrong step
        assert_eq!(
            receive_transition(
                JobChannel::JobWork,
                JobStep::SewingStarted,
                LogisticsStatus::InTransit,
            )
            .unwrap_err(),
            TransitionError::NotInTransit
        );
        // Already received
        assert_eq!(
            receive_transition(
                JobChannel::JobWork,
                JobStep::StitchingCompleted,
                LogisticsStatus::ReceivedAtFactory,
            )
            .unwrap_err(),
            TransitionError::NotInTransit
        );
    }

    /// Skipping a stage is refused
    #[test]
    fn test_stage_skip_refused() {
        let err = advance(
            JobChannel::InHouse,
            JobStep::CuttingPending,
            JobStatus::InProgress,
            StageEvent::SewingStarted,
        )
        .unwrap_err();

        assert!(matches!(err, TransitionError::InvalidEvent { .. }));
    }

    /// Reporting the same completion twice is refused
    #[test]
    fn test_duplicate_event_refused() {
        let t = advance(
            JobChannel::InHouse,
            JobStep::CuttingStarted,
            JobStatus::InProgress,
            StageEvent::CuttingCompleted,
        )
        .unwrap();

        let err = advance(
            JobChannel::InHouse,
            t.next_step,
            t.next_status,
            StageEvent::CuttingCompleted,
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidEvent { .. }));
    }

    /// Terminal statuses reject every event
    #[test]
    fn test_terminal_rejects_all_events() {
        for status in [JobStatus::Completed, JobStatus::QcRejected] {
            assert!(status.is_terminal());
            for event in ALL_EVENTS {
                assert_eq!(
                    advance(JobChannel::InHouse, JobStep::QcCompleted, status, event)
                        .unwrap_err(),
                    TransitionError::Terminal
                );
            }
        }
    }

    /// Full-buy jobs start in procurement, everything else at materials
    #[test]
    fn test_initial_steps_per_channel() {
        assert_eq!(
            JobChannel::FullBuy.initial_step(),
            JobStep::ProcurementPending
        );
        assert_eq!(JobChannel::InHouse.initial_step(), JobStep::MaterialPending);
        assert_eq!(JobChannel::JobWork.initial_step(), JobStep::MaterialPending);
    }

    /// Job number prefixes follow channel and manual origin
    #[test]
    fn test_job_number_prefixes() {
        assert_eq!(JobChannel::InHouse.id_prefix(false), "JC-IN");
        assert_eq!(JobChannel::JobWork.id_prefix(false), "JC-JW");
        assert_eq!(JobChannel::FullBuy.id_prefix(false), "TR-REQ");
        assert_eq!(JobChannel::InHouse.id_prefix(true), "MAN-STK");
    }

    /// Step strings round-trip
    #[test]
    fn test_step_round_trip() {
        let steps = [
            JobStep::ProcurementPending,
            JobStep::PoRaised,
            JobStep::MaterialPending,
            JobStep::CuttingPending,
            JobStep::CuttingStarted,
            JobStep::StitchingPending,
            JobStep::SewingStarted,
            JobStep::StitchingCompleted,
            JobStep::StitchingQcPending,
            JobStep::PackagingPending,
            JobStep::PackagingStarted,
            JobStep::FinalQcPending,
            JobStep::QcReviewNeeded,
            JobStep::QcCompleted,
            JobStep::Scrapped,
        ];
        for step in steps {
            assert_eq!(JobStep::from_str(step.as_str()), Some(step));
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn step_strategy() -> impl Strategy<Value = JobStep> {
    prop_oneof![
        Just(JobStep::ProcurementPending),
        Just(JobStep::PoRaised),
        Just(JobStep::MaterialPending),
        Just(JobStep::CuttingPending),
        Just(JobStep::CuttingStarted),
        Just(JobStep::StitchingPending),
        Just(JobStep::SewingStarted),
        Just(JobStep::StitchingCompleted),
        Just(JobStep::StitchingQcPending),
        Just(JobStep::PackagingPending),
        Just(JobStep::PackagingStarted),
        Just(JobStep::FinalQcPending),
        Just(JobStep::QcReviewNeeded),
        Just(JobStep::QcCompleted),
        Just(JobStep::Scrapped),
    ]
}

fn event_strategy() -> impl Strategy<Value = StageEvent> {
    prop_oneof![
        Just(StageEvent::CuttingStarted),
        Just(StageEvent::CuttingCompleted),
        Just(StageEvent::SewingStarted),
        Just(StageEvent::StitchingCompleted),
        Just(StageEvent::PackagingStarted),
        Just(StageEvent::PackagingCompleted),
    ]
}

fn channel_strategy() -> impl Strategy<Value = JobChannel> {
    prop_oneof![
        Just(JobChannel::InHouse),
        Just(JobChannel::JobWork),
        Just(JobChannel::FullBuy),
    ]
}

proptest! {
    /// From any non-terminal state, at most one event applies; every
    /// accepted transition moves to a different step
    #[test]
    fn prop_at_most_one_event_applies(
        channel in channel_strategy(),
        step in step_strategy(),
    ) {
        let accepted: Vec<_> = ALL_EVENTS
            .iter()
            .filter(|e| advance(channel, step, JobStatus::InProgress, **e).is_ok())
            .collect();
        prop_assert!(accepted.len() <= 1);
    }

    /// Accepted transitions never loop in place
    #[test]
    fn prop_transitions_progress(
        channel in channel_strategy(),
        step in step_strategy(),
        event in event_strategy(),
    ) {
        if let Ok(t) = advance(channel, step, JobStatus::InProgress, event) {
            prop_assert_ne!(t.next_step, step);
        }
    }

    /// Only job-work stitching completion ever enters transit
    #[test]
    fn prop_only_job_work_enters_transit(
        channel in channel_strategy(),
        step in step_strategy(),
        event in event_strategy(),
    ) {
        if let Ok(t) = advance(channel, step, JobStatus::InProgress, event) {
            if t.enters_transit {
                prop_assert_eq!(channel, JobChannel::JobWork);
                prop_assert_eq!(event, StageEvent::StitchingCompleted);
            }
        }
    }
}
