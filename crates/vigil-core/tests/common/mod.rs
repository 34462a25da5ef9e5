#![allow(dead_code)]

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vigil_core::{Options, Rule, RuleOutput, RuleSet, ValidationSession, ValidationTrigger};

pub fn session(rules: RuleSet, trigger: ValidationTrigger) -> ValidationSession {
    ValidationSession::new(rules, Options::default().validation_trigger(trigger)).unwrap()
}

/// A rule failing with `message` while the field is missing or an empty string.
pub fn required(field: &'static str, message: &'static str) -> Rule {
    Rule::from_fn(move |model, _| {
        Ok(match model.get(field) {
            Some(Value::String(s)) if !s.is_empty() => RuleOutput::Pass,
            _ => RuleOutput::message(message),
        })
    })
    .required()
}

/// A rule that counts its invocations and always reports `output`.
pub fn counting(counter: &Arc<AtomicUsize>, output: RuleOutput) -> Rule {
    let counter = counter.clone();
    Rule::from_fn(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(output.clone())
    })
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
