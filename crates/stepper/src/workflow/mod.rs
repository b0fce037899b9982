pub mod controller;
pub mod navigation;
pub mod observer;
pub mod progress;
pub mod state;
pub mod timers;

pub use controller::{WorkflowController, WorkflowControllerBuilder, WorkflowSnapshot};
pub use navigation::{Decision, FollowUp, Ignored, NavigationEngine, Transition};
pub use observer::{ChannelObserver, WorkflowEvent, WorkflowObserver};
pub use progress::{progress, summarize, StatusSummary};
pub use state::WorkflowState;
pub use timers::{TimerKind, TimerSet};
