//! Transition rules.
//!
//! Every intent is either applied to the [`WorkflowState`] and turned into a
//! [`Transition`], or rejected with an [`Ignored`] reason. Reasons exist for
//! logging and metrics only; hosts never see them.

use thiserror::Error;

use crate::{
    config::ControllerConfig,
    step::{Step, StepStatus, StepValidation},
    workflow::{WorkflowEvent, WorkflowState},
};

/// Work the controller must schedule after applying a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    None,
    /// Release the transition lock taken at `epoch`.
    ReleaseLock { epoch: u64 },
    /// Navigate to `index` after the auto-advance delay.
    AutoAdvance { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub event: WorkflowEvent,
    pub follow_up: FollowUp,
}

impl Transition {
    fn notify_only(event: WorkflowEvent) -> Self {
        Self {
            event,
            follow_up: FollowUp::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ignored {
    #[error("workflow has no steps")]
    Empty,
    #[error("index {index} is out of bounds for {len} steps")]
    OutOfBounds { index: usize, len: usize },
    #[error("step {0} is disabled")]
    Disabled(usize),
    #[error("a transition is already in flight")]
    Locked,
    #[error("step navigation is not allowed")]
    NavigationNotAllowed,
    #[error("step skipping is not allowed")]
    SkippingNotAllowed,
    #[error("step {0} cannot be skipped")]
    NotSkippable(usize),
    #[error("step {0} cannot be edited")]
    NotEditable(usize),
    #[error("step {0} cannot be deleted")]
    NotDeletable(usize),
    #[error("step reordering is not allowed")]
    ReorderingNotAllowed,
    #[error("step {0} cannot be moved onto itself")]
    SamePosition(usize),
    #[error("already at the first step")]
    AtFirstStep,
}

impl Ignored {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Ignored::Empty => "empty",
            Ignored::OutOfBounds { .. } => "out_of_bounds",
            Ignored::Disabled(_) => "disabled",
            Ignored::Locked => "locked",
            Ignored::NavigationNotAllowed => "navigation_not_allowed",
            Ignored::SkippingNotAllowed => "skipping_not_allowed",
            Ignored::NotSkippable(_) => "not_skippable",
            Ignored::NotEditable(_) => "not_editable",
            Ignored::NotDeletable(_) => "not_deletable",
            Ignored::ReorderingNotAllowed => "reordering_not_allowed",
            Ignored::SamePosition(_) => "same_position",
            Ignored::AtFirstStep => "at_first_step",
        }
    }
}

pub type Decision = std::result::Result<Transition, Ignored>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationEngine {
    auto_advance: bool,
    allow_navigation: bool,
    allow_skipping: bool,
    allow_editing: bool,
    allow_deletion: bool,
    allow_reordering: bool,
}

impl From<&ControllerConfig> for NavigationEngine {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            auto_advance: config.auto_advance,
            allow_navigation: config.allow_navigation,
            allow_skipping: config.allow_skipping,
            allow_editing: config.allow_editing,
            allow_deletion: config.allow_deletion,
            allow_reordering: config.allow_reordering,
        }
    }
}

impl NavigationEngine {
    pub fn go_to(&self, state: &mut WorkflowState, index: usize) -> Decision {
        if !self.allow_navigation {
            return Err(Ignored::NavigationNotAllowed);
        }
        if state.is_locked() {
            return Err(Ignored::Locked);
        }
        let step = checked_step(state, index)?;
        if step.is_disabled() {
            return Err(Ignored::Disabled(index));
        }

        state.set_current(index);
        let epoch = state.engage_lock();
        let step = state.steps()[index].clone();

        Ok(Transition {
            event: WorkflowEvent::StepChange { index, step },
            follow_up: FollowUp::ReleaseLock { epoch },
        })
    }

    /// Advance one step, or finish the workflow when already on the last.
    pub fn next(&self, state: &mut WorkflowState) -> Decision {
        let current = state.current_index().ok_or(Ignored::Empty)?;

        if state.is_last(current) {
            Ok(Transition::notify_only(WorkflowEvent::Complete))
        } else {
            self.go_to(state, current + 1)
        }
    }

    pub fn previous(&self, state: &mut WorkflowState) -> Decision {
        match state.current_index() {
            None => Err(Ignored::Empty),
            Some(0) => Err(Ignored::AtFirstStep),
            Some(current) => self.go_to(state, current - 1),
        }
    }

    /// Mark a step completed. Validation is advisory and not consulted.
    pub fn complete(&self, state: &mut WorkflowState, index: usize) -> Decision {
        checked_step(state, index)?;
        let step = mark(state, index, StepStatus::Completed)?;

        Ok(Transition {
            event: WorkflowEvent::StepComplete { index, step },
            follow_up: self.auto_advance_after(state, index),
        })
    }

    pub fn skip(&self, state: &mut WorkflowState, index: usize) -> Decision {
        if !self.allow_skipping {
            return Err(Ignored::SkippingNotAllowed);
        }
        let step = checked_step(state, index)?;
        if !step.is_skippable {
            return Err(Ignored::NotSkippable(index));
        }
        let step = mark(state, index, StepStatus::Skipped)?;

        Ok(Transition {
            event: WorkflowEvent::StepSkip { index, step },
            follow_up: self.auto_advance_after(state, index),
        })
    }

    pub fn edit(&self, state: &WorkflowState, index: usize) -> Decision {
        let step = checked_step(state, index)?;
        if !self.allow_editing || !step.is_editable {
            return Err(Ignored::NotEditable(index));
        }

        Ok(Transition::notify_only(WorkflowEvent::StepEdit {
            index,
            step: step.clone(),
        }))
    }

    pub fn delete(&self, state: &WorkflowState, index: usize) -> Decision {
        let step = checked_step(state, index)?;
        if !self.allow_deletion || !step.is_deletable {
            return Err(Ignored::NotDeletable(index));
        }

        Ok(Transition::notify_only(WorkflowEvent::StepDelete {
            index,
            step: step.clone(),
        }))
    }

    pub fn reorder(&self, state: &WorkflowState, from: usize, to: usize) -> Decision {
        if !self.allow_reordering {
            return Err(Ignored::ReorderingNotAllowed);
        }
        checked_step(state, from)?;
        checked_step(state, to)?;
        if from == to {
            return Err(Ignored::SamePosition(from));
        }

        Ok(Transition::notify_only(WorkflowEvent::StepReorder { from, to }))
    }

    /// Host-driven status assignment; any status may replace any other.
    pub fn set_status(
        &self,
        state: &mut WorkflowState,
        index: usize,
        status: StepStatus,
    ) -> Decision {
        checked_step(state, index)?;
        let step = mark(state, index, status)?;

        Ok(Transition::notify_only(WorkflowEvent::StepStatusChange { index, step }))
    }

    pub fn set_validation(
        &self,
        state: &mut WorkflowState,
        index: usize,
        validation: Option<StepValidation>,
    ) -> Decision {
        checked_step(state, index)?;
        let step = match state.step_mut(index) {
            Some(step) => {
                step.validation = validation;
                step.clone()
            }
            None => return Err(Ignored::OutOfBounds { index, len: state.len() }),
        };

        Ok(Transition::notify_only(WorkflowEvent::StepValidationChange { index, step }))
    }

    pub fn reset(&self, state: &mut WorkflowState, initial: &WorkflowState) -> Decision {
        state.restore(initial);
        Ok(Transition::notify_only(WorkflowEvent::Reset))
    }

    pub fn save(&self) -> Decision {
        Ok(Transition::notify_only(WorkflowEvent::Save))
    }

    fn auto_advance_after(&self, state: &WorkflowState, index: usize) -> FollowUp {
        if self.auto_advance && !state.is_last(index) {
            FollowUp::AutoAdvance { index: index + 1 }
        } else {
            FollowUp::None
        }
    }
}

fn checked_step(state: &WorkflowState, index: usize) -> Result<&Step, Ignored> {
    if state.is_empty() {
        return Err(Ignored::Empty);
    }
    state.step(index).ok_or(Ignored::OutOfBounds {
        index,
        len: state.len(),
    })
}

fn mark(state: &mut WorkflowState, index: usize, status: StepStatus) -> Result<Step, Ignored> {
    let len = state.len();
    state
        .set_status(index, status)
        .cloned()
        .ok_or(Ignored::OutOfBounds { index, len })
}
