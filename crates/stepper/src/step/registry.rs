use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::{step::Step, Error, Result};

/// Ordered, caller-supplied step definitions.
///
/// Order is significant and never changes during a controller's lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepRegistry {
    steps: Vec<Step>,
}

impl StepRegistry {
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if step.id.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Step '{}' has an empty id",
                    step.title
                )));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(Error::Validation(format!("Duplicate step id: {}", step.id)));
            }
        }

        Ok(Self { steps })
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let steps: Vec<Step> = serde_json::from_str(input)?;
        Self::new(steps)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let steps: Vec<Step> = serde_yaml::from_str(input)?;
        Self::new(steps)
    }

    /// Load a registry file, picking the format from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let registry = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents)?,
            other => {
                return Err(Error::Config(format!(
                    "Unsupported step registry format: {} (expected .json, .yaml or .yml)",
                    other.unwrap_or("<none>")
                )))
            }
        };

        info!("Loaded {} steps from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}
