use serde::Serialize;
use tokio::sync::mpsc;

use crate::step::Step;

/// Host callback contract.
///
/// Every method has an empty default so hosts implement only what they
/// render. The controller ignores anything a callback does besides calling
/// back into it.
///
/// Steps passed to callbacks reflect the change being reported:
/// `on_step_complete` sees status `completed`, `on_step_skip` sees `skipped`,
/// `on_step_status_change` sees the new status.
#[cfg_attr(test, mockall::automock)]
pub trait WorkflowObserver: Send + Sync {
    /// The active step changed.
    fn on_step_change(&self, _index: usize, _step: &Step) {}

    fn on_step_complete(&self, _index: usize, _step: &Step) {}

    fn on_step_skip(&self, _index: usize, _step: &Step) {}

    /// Delegation only; the controller does not change the step.
    fn on_step_edit(&self, _index: usize, _step: &Step) {}

    /// Delegation only; the host owns removal.
    fn on_step_delete(&self, _index: usize, _step: &Step) {}

    /// Delegation only; the host owns reordering.
    fn on_step_reorder(&self, _from: usize, _to: usize) {}

    fn on_step_status_change(&self, _index: usize, _step: &Step) {}

    fn on_step_validation_change(&self, _index: usize, _step: &Step) {}

    /// `next()` was invoked on the final step.
    fn on_complete(&self) {}

    fn on_reset(&self) {}

    fn on_save(&self) {}
}

/// One host notification. Exactly one is produced per applied operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StepChange { index: usize, step: Step },
    StepComplete { index: usize, step: Step },
    StepSkip { index: usize, step: Step },
    StepEdit { index: usize, step: Step },
    StepDelete { index: usize, step: Step },
    StepReorder { from: usize, to: usize },
    StepStatusChange { index: usize, step: Step },
    StepValidationChange { index: usize, step: Step },
    Complete,
    Reset,
    Save,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::StepChange { .. } => "step_change",
            WorkflowEvent::StepComplete { .. } => "step_complete",
            WorkflowEvent::StepSkip { .. } => "step_skip",
            WorkflowEvent::StepEdit { .. } => "step_edit",
            WorkflowEvent::StepDelete { .. } => "step_delete",
            WorkflowEvent::StepReorder { .. } => "step_reorder",
            WorkflowEvent::StepStatusChange { .. } => "step_status_change",
            WorkflowEvent::StepValidationChange { .. } => "step_validation_change",
            WorkflowEvent::Complete => "complete",
            WorkflowEvent::Reset => "reset",
            WorkflowEvent::Save => "save",
        }
    }

    /// Index of the step the event is about, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            WorkflowEvent::StepChange { index, .. }
            | WorkflowEvent::StepComplete { index, .. }
            | WorkflowEvent::StepSkip { index, .. }
            | WorkflowEvent::StepEdit { index, .. }
            | WorkflowEvent::StepDelete { index, .. }
            | WorkflowEvent::StepStatusChange { index, .. }
            | WorkflowEvent::StepValidationChange { index, .. } => Some(*index),
            WorkflowEvent::StepReorder { .. }
            | WorkflowEvent::Complete
            | WorkflowEvent::Reset
            | WorkflowEvent::Save => None,
        }
    }

    /// Invoke the matching callback on `observer`.
    pub fn notify(&self, observer: &dyn WorkflowObserver) {
        match self {
            WorkflowEvent::StepChange { index, step } => observer.on_step_change(*index, step),
            WorkflowEvent::StepComplete { index, step } => observer.on_step_complete(*index, step),
            WorkflowEvent::StepSkip { index, step } => observer.on_step_skip(*index, step),
            WorkflowEvent::StepEdit { index, step } => observer.on_step_edit(*index, step),
            WorkflowEvent::StepDelete { index, step } => observer.on_step_delete(*index, step),
            WorkflowEvent::StepReorder { from, to } => observer.on_step_reorder(*from, *to),
            WorkflowEvent::StepStatusChange { index, step } => {
                observer.on_step_status_change(*index, step)
            }
            WorkflowEvent::StepValidationChange { index, step } => {
                observer.on_step_validation_change(*index, step)
            }
            WorkflowEvent::Complete => observer.on_complete(),
            WorkflowEvent::Reset => observer.on_reset(),
            WorkflowEvent::Save => observer.on_save(),
        }
    }
}

/// Forwards every callback as a [`WorkflowEvent`] over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: WorkflowEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl WorkflowObserver for ChannelObserver {
    fn on_step_change(&self, index: usize, step: &Step) {
        self.forward(WorkflowEvent::StepChange { index, step: step.clone() });
    }

    fn on_step_complete(&self, index: usize, step: &Step) {
        self.forward(WorkflowEvent::StepComplete { index, step: step.clone() });
    }

    fn on_step_skip(&self, index: usize, step: &Step) {
        self.forward(WorkflowEvent::StepSkip { index, step: step.clone() });
    }

    fn on_step_edit(&self, index: usize, step: &Step) {
        self.forward(WorkflowEvent::StepEdit { index, step: step.clone() });
    }

    fn on_step_delete(&self, index: usize, step: &Step) {
        self.forward(WorkflowEvent::StepDelete { index, step: step.clone() });
    }

    fn on_step_reorder(&self, from: usize, to: usize) {
        self.forward(WorkflowEvent::StepReorder { from, to });
    }

    fn on_step_status_change(&self, index: usize, step: &Step) {
        self.forward(WorkflowEvent::StepStatusChange { index, step: step.clone() });
    }

    fn on_step_validation_change(&self, index: usize, step: &Step) {
        self.forward(WorkflowEvent::StepValidationChange { index, step: step.clone() });
    }

    fn on_complete(&self) {
        self.forward(WorkflowEvent::Complete);
    }

    fn on_reset(&self) {
        self.forward(WorkflowEvent::Reset);
    }

    fn on_save(&self) {
        self.forward(WorkflowEvent::Save);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_observer_round_trips_every_event() {
        let (observer, mut rx) = ChannelObserver::new();
        let step = Step::new("review", "Review order");

        let events = vec![
            WorkflowEvent::StepChange { index: 1, step: step.clone() },
            WorkflowEvent::StepComplete { index: 1, step: step.clone() },
            WorkflowEvent::StepSkip { index: 1, step: step.clone() },
            WorkflowEvent::StepEdit { index: 1, step: step.clone() },
            WorkflowEvent::StepDelete { index: 1, step: step.clone() },
            WorkflowEvent::StepReorder { from: 0, to: 2 },
            WorkflowEvent::StepStatusChange { index: 1, step: step.clone() },
            WorkflowEvent::StepValidationChange { index: 1, step },
            WorkflowEvent::Complete,
            WorkflowEvent::Reset,
            WorkflowEvent::Save,
        ];

        for event in &events {
            event.notify(&observer);
        }

        for expected in events {
            assert_eq!(rx.try_recv().unwrap(), expected);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_not_an_error() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_complete();
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = WorkflowEvent::StepReorder { from: 2, to: 0 };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "step_reorder", "from": 2, "to": 0 })
        );
        assert_eq!(event.name(), "step_reorder");
        assert_eq!(event.index(), None);
        assert_eq!(
            WorkflowEvent::StepSkip { index: 4, step: Step::new("x", "X") }.index(),
            Some(4)
        );
    }

    #[test]
    fn test_notify_calls_only_the_matching_callback() {
        let mut observer = MockWorkflowObserver::new();
        observer
            .expect_on_step_skip()
            .withf(|index, step| *index == 3 && step.id == "gift")
            .times(1)
            .return_const(());

        WorkflowEvent::StepSkip {
            index: 3,
            step: Step::new("gift", "Gift wrap"),
        }
        .notify(&observer);
    }
}
