// =============================================================================
// PRODUCTION STAGE PROGRESS RESOLVER
// =============================================================================
// A production batch moves through four steps in the UI:
//
//     planning -> machine -> wastage -> individual
//
// The current step is a navigational concept chosen by the caller, not a
// persisted batch field. This resolver only renders whatever step it is given;
// it does not validate or block transitions.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BatchStage {
    #[default]
    Planning,
    Machine,
    Wastage,
    Individual,
}

impl BatchStage {
    /// Fixed pipeline order
    pub const PIPELINE: [BatchStage; 4] = [
        BatchStage::Planning,
        BatchStage::Machine,
        BatchStage::Wastage,
        BatchStage::Individual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStage::Planning => "planning",
            BatchStage::Machine => "machine",
            BatchStage::Wastage => "wastage",
            BatchStage::Individual => "individual",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BatchStage::Planning => "Planning",
            BatchStage::Machine => "Machine Processing",
            BatchStage::Wastage => "Wastage Tracking",
            BatchStage::Individual => "Individual Products",
        }
    }

    fn position(&self) -> usize {
        match self {
            BatchStage::Planning => 0,
            BatchStage::Machine => 1,
            BatchStage::Wastage => 2,
            BatchStage::Individual => 3,
        }
    }
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BatchStage::PIPELINE
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown production stage: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStep {
    pub stage: BatchStage,
    pub label: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageProgress {
    pub current: BatchStage,
    pub stages: [StageStep; 4],
    /// 0..=100, rounded half up
    pub overall_percent: u8,
}

/// Build the four-step progress model for `current`.
///
/// Steps before `current` are completed, `current` is active, later steps are
/// pending. `overall_percent = round((completed + 0.5 * active) / 4 * 100)`,
/// so the last stage renders as 88%, never 100%.
pub fn resolve_stage_progress(current: BatchStage) -> StageProgress {
    let stages = BatchStage::PIPELINE.map(|stage| StageStep {
        stage,
        label: stage.label(),
        status: match stage.position().cmp(&current.position()) {
            std::cmp::Ordering::Less => StepStatus::Completed,
            std::cmp::Ordering::Equal => StepStatus::Active,
            std::cmp::Ordering::Greater => StepStatus::Pending,
        },
    });

    let completed = stages.iter().filter(|s| s.status == StepStatus::Completed).count();
    let active = stages.iter().filter(|s| s.status == StepStatus::Active).count();
    let fraction = (completed as f64 + active as f64 * 0.5) / stages.len() as f64;

    StageProgress {
        current,
        stages,
        // f64::round rounds half away from zero, which is half up for
        // non-negative values
        overall_percent: (fraction * 100.0).round() as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(progress: &StageProgress) -> Vec<StepStatus> {
        progress.stages.iter().map(|s| s.status).collect()
    }

    #[test]
    fn test_machine_stage_progress() {
        let progress = resolve_stage_progress(BatchStage::Machine);

        assert_eq!(
            statuses(&progress),
            vec![StepStatus::Completed, StepStatus::Active, StepStatus::Pending, StepStatus::Pending]
        );
        assert_eq!(progress.overall_percent, 38);
    }

    #[test]
    fn test_planning_is_first_and_active() {
        let progress = resolve_stage_progress(BatchStage::Planning);

        assert_eq!(progress.stages[0].status, StepStatus::Active);
        assert!(progress.stages[1..].iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(progress.overall_percent, 13);
    }

    #[test]
    fn test_percent_for_every_stage() {
        let percents: Vec<u8> = BatchStage::PIPELINE
            .iter()
            .map(|stage| resolve_stage_progress(*stage).overall_percent)
            .collect();

        assert_eq!(percents, vec![13, 38, 63, 88]);
    }

    #[test]
    fn test_exactly_one_active_step() {
        for stage in BatchStage::PIPELINE {
            let progress = resolve_stage_progress(stage);
            let active: Vec<_> = progress
                .stages
                .iter()
                .filter(|s| s.status == StepStatus::Active)
                .collect();

            assert_eq!(active.len(), 1);
            assert_eq!(active[0].stage, stage);
        }
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let progress = resolve_stage_progress(BatchStage::Individual);
        let order: Vec<_> = progress.stages.iter().map(|s| s.stage).collect();

        assert_eq!(order, BatchStage::PIPELINE.to_vec());
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!("wastage".parse::<BatchStage>(), Ok(BatchStage::Wastage));
        assert!("packaging".parse::<BatchStage>().is_err());
        assert_eq!(BatchStage::default(), BatchStage::Planning);
    }
}
