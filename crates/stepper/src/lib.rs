pub mod config;
pub mod metrics;
pub mod step;
pub mod workflow;

use thiserror::Error;

pub use config::ControllerConfig;
pub use step::{Step, StepMetadata, StepRegistry, StepStatus, StepValidation};
pub use workflow::{
    ChannelObserver, StatusSummary, WorkflowController, WorkflowControllerBuilder, WorkflowEvent,
    WorkflowObserver, WorkflowSnapshot,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("No tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
