pub mod registry;
pub mod types;

pub use registry::StepRegistry;
pub use types::{Step, StepMetadata, StepStatus, StepValidation};
