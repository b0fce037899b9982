use serde::Serialize;

use crate::step::{Step, StepStatus};

/// Percentage of steps whose status is `Completed`.
///
/// Skipped steps do not count. An empty workflow is at 0%.
pub fn progress(steps: &[Step]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }

    let completed = steps
        .iter()
        .filter(|step| step.status == StepStatus::Completed)
        .count();

    (completed as f64 / steps.len() as f64) * 100.0
}

/// Per-status step counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub pending: usize,
    pub current: usize,
    pub completed: usize,
    pub error: usize,
    pub disabled: usize,
    pub skipped: usize,
}

impl StatusSummary {
    pub fn count(&self, status: StepStatus) -> usize {
        match status {
            StepStatus::Pending => self.pending,
            StepStatus::Current => self.current,
            StepStatus::Completed => self.completed,
            StepStatus::Error => self.error,
            StepStatus::Disabled => self.disabled,
            StepStatus::Skipped => self.skipped,
        }
    }

    /// Steps that are neither completed nor skipped.
    pub fn remaining(&self) -> usize {
        self.total - self.completed - self.skipped
    }
}

pub fn summarize(steps: &[Step]) -> StatusSummary {
    steps.iter().fold(
        StatusSummary {
            total: steps.len(),
            ..Default::default()
        },
        |mut summary, step| {
            match step.status {
                StepStatus::Pending => summary.pending += 1,
                StepStatus::Current => summary.current += 1,
                StepStatus::Completed => summary.completed += 1,
                StepStatus::Error => summary.error += 1,
                StepStatus::Disabled => summary.disabled += 1,
                StepStatus::Skipped => summary.skipped += 1,
            }
            summary
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(statuses: &[StepStatus]) -> Vec<Step> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| Step::new(format!("s{}", i), "step").with_status(*status))
            .collect()
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(progress(&[]), 0.0);
    }

    #[test]
    fn test_counts_only_completed() {
        let all = steps(&[
            StepStatus::Completed,
            StepStatus::Skipped,
            StepStatus::Error,
            StepStatus::Pending,
        ]);
        assert_eq!(progress(&all), 25.0);
    }

    #[test]
    fn test_monotonic_as_steps_complete_and_flat_on_skip() {
        let mut all = steps(&[StepStatus::Pending; 5]);
        let mut last = progress(&all);

        for i in 0..all.len() {
            let before_skip = progress(&all);
            all[i].status = StepStatus::Skipped;
            assert_eq!(progress(&all), before_skip);

            all[i].status = StepStatus::Completed;
            let now = progress(&all);
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_summary_counts_each_status() {
        let all = steps(&[
            StepStatus::Completed,
            StepStatus::Completed,
            StepStatus::Skipped,
            StepStatus::Disabled,
            StepStatus::Current,
        ]);
        let summary = summarize(&all);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.count(StepStatus::Completed), 2);
        assert_eq!(summary.count(StepStatus::Skipped), 1);
        assert_eq!(summary.count(StepStatus::Disabled), 1);
        assert_eq!(summary.count(StepStatus::Pending), 0);
        assert_eq!(summary.remaining(), 2);
    }
}
