use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::{workflow::navigation::Ignored, workflow::WorkflowEvent, Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref TRANSITIONS_APPLIED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stepper_transitions_applied_total",
            "Total number of workflow transitions applied, by emitted event."
        ),
        &["event"]
    )
    .expect("valid transitions_applied metric definition");
    pub static ref INTENTS_IGNORED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stepper_intents_ignored_total",
            "Total number of workflow intents ignored, by reason."
        ),
        &["reason"]
    )
    .expect("valid intents_ignored metric definition");
}

/// Register the stepper counters. Safe to call more than once.
pub fn register_metrics() -> Result<()> {
    for collector in [
        TRANSITIONS_APPLIED_TOTAL.clone(),
        INTENTS_IGNORED_TOTAL.clone(),
    ] {
        match REGISTRY.register(Box::new(collector)) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

pub fn record_applied(event: &WorkflowEvent) {
    TRANSITIONS_APPLIED_TOTAL
        .with_label_values(&[event.name()])
        .inc();
}

pub fn record_ignored(ignored: &Ignored) {
    INTENTS_IGNORED_TOTAL
        .with_label_values(&[ignored.reason()])
        .inc();
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Internal(format!("Failed to convert metrics to string: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_recorded_counters_show_up_in_exposition() {
        register_metrics().unwrap();
        let before = INTENTS_IGNORED_TOTAL.with_label_values(&["locked"]).get();

        record_ignored(&Ignored::Locked);
        record_applied(&WorkflowEvent::Save);

        assert_eq!(
            INTENTS_IGNORED_TOTAL.with_label_values(&["locked"]).get(),
            before + 1
        );
        let text = gather_metrics().unwrap();
        assert!(text.contains("stepper_intents_ignored_total"));
        assert!(text.contains("stepper_transitions_applied_total{event=\"save\"}"));
    }
}
