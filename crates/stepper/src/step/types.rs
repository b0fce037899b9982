use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Display status of a single step.
///
/// The controller never derives navigation state from this value except for
/// `Disabled`, which blocks `go_to`. Any status may be replaced by any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Current,
    Completed,
    Error,
    Disabled,
    Skipped,
}

impl StepStatus {
    pub const ALL: [StepStatus; 6] = [
        StepStatus::Pending,
        StepStatus::Current,
        StepStatus::Completed,
        StepStatus::Error,
        StepStatus::Disabled,
        StepStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Current => "current",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
            StepStatus::Disabled => "disabled",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("Unknown step status: {}", s)))
    }
}

/// Advisory validation result attached to a step by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepValidation {
    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StepValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
            errors: Vec::new(),
        }
    }

    pub fn invalid(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
            errors,
        }
    }
}

/// Passthrough metadata. The controller never reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepMetadata {
    /// Human readable estimate, e.g. "5 minutes"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Any other host-defined keys
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One unit of a multi-stage workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Stable identifier, unique within a registry
    #[serde(default = "generate_step_id")]
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<StepValidation>,

    #[serde(default)]
    pub is_optional: bool,

    #[serde(default)]
    pub is_skippable: bool,

    #[serde(default)]
    pub is_editable: bool,

    #[serde(default)]
    pub is_deletable: bool,

    #[serde(default)]
    pub metadata: StepMetadata,
}

fn generate_step_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Step {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: StepStatus::Pending,
            validation: None,
            is_optional: false,
            is_skippable: false,
            is_editable: false,
            is_deletable: false,
            metadata: StepMetadata::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_validation(mut self, validation: StepValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_metadata(mut self, metadata: StepMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn skippable(mut self) -> Self {
        self.is_skippable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.is_editable = true;
        self
    }

    pub fn deletable(mut self) -> Self {
        self.is_deletable = true;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.status == StepStatus::Disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in StepStatus::ALL {
            let parsed: StepStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!("Completed".parse::<StepStatus>().unwrap(), StepStatus::Completed);
        assert!("finished".parse::<StepStatus>().is_err());
    }

    #[test]
    fn test_step_defaults_from_minimal_document() {
        let step: Step = serde_json::from_value(json!({ "title": "Delivery address" })).unwrap();

        assert!(!step.id.is_empty());
        assert_eq!(step.status, StepStatus::Pending);
        assert!(!step.is_skippable);
        assert!(step.validation.is_none());
        assert_eq!(step.metadata, StepMetadata::default());
    }

    #[test]
    fn test_step_uses_camel_case_keys() {
        let step: Step = serde_json::from_value(json!({
            "id": "payment",
            "title": "Payment",
            "status": "error",
            "isSkippable": true,
            "isEditable": true,
            "validation": { "isValid": false, "message": "Card declined", "errors": ["cvc"] },
            "metadata": { "estimatedTime": "2 minutes", "tags": ["checkout"], "priority": 3 }
        }))
        .unwrap();

        assert_eq!(step.status, StepStatus::Error);
        assert!(step.is_skippable && step.is_editable);
        assert!(!step.is_deletable);
        assert_eq!(
            step.validation,
            Some(StepValidation::invalid("Card declined", vec!["cvc".to_string()]))
        );
        assert_eq!(step.metadata.estimated_time.as_deref(), Some("2 minutes"));
        assert_eq!(step.metadata.extra.get("priority"), Some(&json!(3)));

        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["isSkippable"], json!(true));
        assert_eq!(value["metadata"]["priority"], json!(3));
    }

    #[test]
    fn test_builder_serializes_like_a_document() {
        let step = Step::new("gift", "Gift options")
            .with_description("Wrapping and a card")
            .with_validation(StepValidation::valid())
            .with_metadata(StepMetadata {
                required_fields: vec!["recipient".to_string()],
                ..StepMetadata::default()
            })
            .optional()
            .deletable();

        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["description"], json!("Wrapping and a card"));
        assert_eq!(value["validation"], json!({ "isValid": true }));
        assert_eq!(value["metadata"], json!({ "requiredFields": ["recipient"] }));
        assert_eq!(value["isOptional"], json!(true));
        assert_eq!(value["isDeletable"], json!(true));
        assert_eq!(value["isEditable"], json!(false));

        let parsed: Step = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, step);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a: Step = serde_json::from_value(json!({ "title": "A" })).unwrap();
        let b: Step = serde_json::from_value(json!({ "title": "B" })).unwrap();
        assert_ne!(a.id, b.id);
    }
}
