use crate::{
    step::{Step, StepRegistry, StepStatus},
    Error, Result,
};

/// Mutable runtime state of one workflow.
///
/// `current_index` is the only source of truth for the active step; the
/// `Current` status on a step is informational and never consulted.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    steps: Vec<Step>,
    current_index: Option<usize>,
    transition_lock: bool,
    lock_epoch: u64,
    generation: u64,
}

impl WorkflowState {
    pub fn new(registry: StepRegistry, initial_index: usize) -> Result<Self> {
        let steps = registry.into_steps();

        let current_index = if steps.is_empty() {
            None
        } else if initial_index < steps.len() {
            Some(initial_index)
        } else {
            return Err(Error::Validation(format!(
                "Initial step index {} is out of range for {} steps",
                initial_index,
                steps.len()
            )));
        };

        Ok(Self {
            steps,
            current_index,
            transition_lock: false,
            lock_epoch: 0,
            generation: 0,
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current_index.and_then(|index| self.steps.get(index))
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.steps.len()
    }

    pub fn is_locked(&self) -> bool {
        self.transition_lock
    }

    /// Bumped on every reset; pending auto-advances compare against it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_current(&mut self, index: usize) {
        debug_assert!(index < self.steps.len());
        self.current_index = Some(index);
    }

    pub(crate) fn set_status(&mut self, index: usize, status: StepStatus) -> Option<&Step> {
        let step = self.steps.get_mut(index)?;
        step.status = status;
        Some(step)
    }

    pub(crate) fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    /// Take the transition lock, returning the epoch a release must present.
    pub(crate) fn engage_lock(&mut self) -> u64 {
        self.lock_epoch += 1;
        self.transition_lock = true;
        self.lock_epoch
    }

    /// Release the lock only if nothing re-engaged it since `epoch`.
    pub(crate) fn release_lock(&mut self, epoch: u64) -> bool {
        if self.transition_lock && self.lock_epoch == epoch {
            self.transition_lock = false;
            true
        } else {
            false
        }
    }

    /// Revert index and statuses to `initial`, dropping the lock.
    pub(crate) fn restore(&mut self, initial: &WorkflowState) {
        self.steps = initial.steps.clone();
        self.current_index = initial.current_index;
        self.transition_lock = false;
        self.lock_epoch += 1;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(n: usize) -> StepRegistry {
        StepRegistry::new(
            (0..n)
                .map(|i| Step::new(format!("s{}", i), format!("Step {}", i)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_index_defaults_and_bounds() {
        let state = WorkflowState::new(registry(3), 0).unwrap();
        assert_eq!(state.current_index(), Some(0));
        assert!(!state.is_locked());

        let state = WorkflowState::new(registry(3), 2).unwrap();
        assert_eq!(state.current_step().map(|s| s.id.as_str()), Some("s2"));

        assert!(WorkflowState::new(registry(3), 3).is_err());
    }

    #[test]
    fn test_empty_registry_has_no_current_index() {
        let state = WorkflowState::new(registry(0), 0).unwrap();
        assert_eq!(state.current_index(), None);
        assert!(state.current_step().is_none());
    }

    #[test]
    fn test_stale_lock_release_is_ignored() {
        let mut state = WorkflowState::new(registry(2), 0).unwrap();
        let first = state.engage_lock();
        assert!(state.release_lock(first));

        let second = state.engage_lock();
        assert!(!state.release_lock(first));
        assert!(state.is_locked());
        assert!(state.release_lock(second));
        assert!(!state.is_locked());
    }

    #[test]
    fn test_restore_reverts_everything_and_bumps_generation() {
        let mut state = WorkflowState::new(registry(3), 0).unwrap();
        let initial = state.clone();

        state.set_current(2);
        state.set_status(1, StepStatus::Completed);
        let epoch = state.engage_lock();

        state.restore(&initial);

        assert_eq!(state.current_index(), Some(0));
        assert_eq!(state.steps(), initial.steps());
        assert!(!state.is_locked());
        assert!(!state.release_lock(epoch));
        assert_eq!(state.generation(), initial.generation() + 1);
    }
}
