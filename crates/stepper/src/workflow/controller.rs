use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::{
    config::ControllerConfig,
    metrics,
    step::{Step, StepRegistry, StepStatus, StepValidation},
    workflow::{
        navigation::{Decision, FollowUp, NavigationEngine},
        progress::{self, StatusSummary},
        timers::{TimerKind, TimerSet},
        WorkflowEvent, WorkflowObserver, WorkflowState,
    },
    Result,
};

/// Point-in-time view of a workflow, for hosts that render from data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub current_index: Option<usize>,
    pub steps: Vec<Step>,
    pub progress: f64,
    pub summary: StatusSummary,
    pub locked: bool,
    pub captured_at: DateTime<Utc>,
}

pub struct WorkflowControllerBuilder {
    registry: StepRegistry,
    config: ControllerConfig,
    initial_index: usize,
    observers: Vec<Arc<dyn WorkflowObserver>>,
}

impl WorkflowControllerBuilder {
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry,
            config: ControllerConfig::default(),
            initial_index: 0,
            observers: Vec::new(),
        }
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn auto_advance(mut self, auto_advance: bool) -> Self {
        self.config.auto_advance = auto_advance;
        self
    }

    pub fn initial_index(mut self, index: usize) -> Self {
        self.initial_index = index;
        self
    }

    pub fn observer<O>(mut self, observer: O) -> Self
    where
        O: WorkflowObserver + 'static,
    {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn shared_observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Must be called from within a tokio runtime, which will run the timers.
    pub fn build(self) -> Result<WorkflowController> {
        self.config.validate()?;
        metrics::register_metrics()?;
        let runtime = Handle::try_current()?;

        let state = WorkflowState::new(self.registry, self.initial_index)?;
        info!(
            "Created workflow controller with {} steps (current: {:?}, auto_advance: {})",
            state.len(),
            state.current_index(),
            self.config.auto_advance
        );

        Ok(WorkflowController {
            inner: Arc::new(Inner {
                engine: NavigationEngine::from(&self.config),
                config: self.config,
                initial: state.clone(),
                state: Mutex::new(state),
                observers: self.observers,
                timers: TimerSet::new(),
                runtime,
                disposed: AtomicBool::new(false),
            }),
        })
    }
}

/// Owns one workflow and notifies the host of every applied change.
///
/// Cloning yields another handle to the same workflow. Illegal intents are
/// dropped silently. Pending timers are cancelled by [`dispose`] and when the
/// last handle goes away.
///
/// [`dispose`]: WorkflowController::dispose
#[derive(Clone)]
pub struct WorkflowController {
    inner: Arc<Inner>,
}

struct Inner {
    config: ControllerConfig,
    engine: NavigationEngine,
    state: Mutex<WorkflowState>,
    initial: WorkflowState,
    observers: Vec<Arc<dyn WorkflowObserver>>,
    timers: TimerSet,
    runtime: Handle,
    disposed: AtomicBool,
}

impl WorkflowController {
    pub fn builder(registry: StepRegistry) -> WorkflowControllerBuilder {
        WorkflowControllerBuilder::new(registry)
    }

    pub fn go_to(&self, index: usize) {
        self.inner.apply("go_to", |engine, state| engine.go_to(state, index));
    }

    pub fn next(&self) {
        self.inner.apply("next", |engine, state| engine.next(state));
    }

    pub fn previous(&self) {
        self.inner.apply("previous", |engine, state| engine.previous(state));
    }

    pub fn complete(&self, index: usize) {
        self.inner.apply("complete", |engine, state| engine.complete(state, index));
    }

    pub fn skip(&self, index: usize) {
        self.inner.apply("skip", |engine, state| engine.skip(state, index));
    }

    pub fn edit(&self, index: usize) {
        self.inner.apply("edit", |engine, state| engine.edit(state, index));
    }

    pub fn delete(&self, index: usize) {
        self.inner.apply("delete", |engine, state| engine.delete(state, index));
    }

    pub fn reorder(&self, from: usize, to: usize) {
        self.inner.apply("reorder", |engine, state| engine.reorder(state, from, to));
    }

    pub fn set_status(&self, index: usize, status: StepStatus) {
        self.inner
            .apply("set_status", |engine, state| engine.set_status(state, index, status));
    }

    pub fn set_validation(&self, index: usize, validation: Option<StepValidation>) {
        self.inner.apply("set_validation", |engine, state| {
            engine.set_validation(state, index, validation)
        });
    }

    pub fn save(&self) {
        self.inner.apply("save", |engine, _| engine.save());
    }

    /// Restore the index and statuses captured at construction.
    pub fn reset(&self) {
        if self.is_disposed() {
            debug!("Ignoring reset on disposed workflow");
            return;
        }
        let cancelled = self.inner.timers.cancel_all();
        if cancelled > 0 {
            debug!("Reset cancelled {} pending timers", cancelled);
        }

        let inner = &self.inner;
        inner.apply("reset", |engine, state| engine.reset(state, &inner.initial));
    }

    /// Cancel pending timers and ignore every later intent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let cancelled = self.inner.timers.close();
        info!("Disposed workflow controller ({} pending timers cancelled)", cancelled);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.state().current_index()
    }

    pub fn current_step(&self) -> Option<Step> {
        self.inner.state().current_step().cloned()
    }

    pub fn step(&self, index: usize) -> Option<Step> {
        self.inner.state().step(index).cloned()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.inner.state().steps().to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state().is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.state().is_locked()
    }

    pub fn progress(&self) -> f64 {
        progress::progress(self.inner.state().steps())
    }

    pub fn summary(&self) -> StatusSummary {
        progress::summarize(self.inner.state().steps())
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.pending()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.inner.state();
        WorkflowSnapshot {
            current_index: state.current_index(),
            steps: state.steps().to_vec(),
            progress: progress::progress(state.steps()),
            summary: progress::summarize(state.steps()),
            locked: state.is_locked(),
            captured_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for WorkflowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowController")
            .field("current_index", &self.current_index())
            .field("steps", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Decide under the state lock, then schedule and notify outside it so
    /// observers may call straight back into the controller.
    fn apply<F>(self: &Arc<Self>, operation: &'static str, decide: F)
    where
        F: FnOnce(&NavigationEngine, &mut WorkflowState) -> Decision,
    {
        if self.is_disposed() {
            debug!(operation, "Ignoring intent on disposed workflow");
            return;
        }

        let (decision, generation) = {
            let mut state = self.state();
            let decision = decide(&self.engine, &mut *state);
            (decision, state.generation())
        };

        match decision {
            Ok(transition) => {
                info!(
                    operation,
                    event = transition.event.name(),
                    index = ?transition.event.index(),
                    "Workflow transition applied"
                );
                metrics::record_applied(&transition.event);
                self.notify(&transition.event);
                self.schedule(transition.follow_up, generation);
            }
            Err(ignored) => {
                debug!(operation, reason = %ignored, "Workflow intent ignored");
                metrics::record_ignored(&ignored);
            }
        }
    }

    fn notify(&self, event: &WorkflowEvent) {
        for observer in &self.observers {
            event.notify(observer.as_ref());
        }
    }

    /// An observer may have disposed the workflow while being notified; no
    /// timer may outlive that.
    fn schedule(self: &Arc<Self>, follow_up: FollowUp, generation: u64) {
        if self.is_disposed() {
            debug!(?follow_up, "Not scheduling follow-up on disposed workflow");
            return;
        }
        match follow_up {
            FollowUp::None => {}
            FollowUp::ReleaseLock { epoch } => {
                let weak = Arc::downgrade(self);
                self.timers.schedule(
                    &self.runtime,
                    TimerKind::LockRelease,
                    self.config.transition_lock(),
                    async move {
                        let Some(inner) = weak.upgrade() else {
                            return;
                        };
                        if inner.is_disposed() {
                            return;
                        }
                        if inner.state().release_lock(epoch) {
                            debug!(epoch, "Transition lock released");
                        }
                    },
                );
            }
            FollowUp::AutoAdvance { index } => {
                let weak: Weak<Inner> = Arc::downgrade(self);
                self.timers.schedule(
                    &self.runtime,
                    TimerKind::AutoAdvance,
                    self.config.auto_advance_delay(),
                    async move {
                        let Some(inner) = weak.upgrade() else {
                            return;
                        };
                        if inner.state().generation() != generation {
                            debug!(index, "Dropping auto-advance scheduled before reset");
                            return;
                        }
                        inner.apply("auto_advance", |engine, state| engine.go_to(state, index));
                    },
                );
            }
        }
    }
}
