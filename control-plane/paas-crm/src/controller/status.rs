use std::collections::BTreeMap;
use std::fmt;

use crate::crd::Quota;
use crate::crd::paas::{PaasStatus, PaasStatusMessage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Find,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Find => write!(f, "find"),
            Step::Create => write!(f, "create"),
            Step::Update => write!(f, "update"),
            Step::Delete => write!(f, "delete"),
        }
    }
}

/// Outcome log of one reconciliation pass. A later entry for the same
/// (level, step, target) overwrites the earlier one.
#[derive(Clone, Debug, Default)]
pub struct StatusRecorder {
    entries: BTreeMap<(Level, Step, String), String>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        level: Level,
        step: Step,
        target: impl fmt::Display,
        message: impl Into<String>,
    ) {
        self.entries
            .insert((level, step, target.to_string()), message.into());
    }

    pub fn info(
        &mut self,
        step: Step,
        target: impl fmt::Display,
        message: impl Into<String>,
    ) {
        self.record(Level::Info, step, target, message);
    }

    pub fn error(
        &mut self,
        step: Step,
        target: impl fmt::Display,
        message: impl Into<String>,
    ) {
        self.record(Level::Error, step, target, message);
    }

    pub fn get(&self, level: Level, step: Step, target: &str) -> Option<&str> {
        self.entries
            .get(&(level, step, target.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> Vec<PaasStatusMessage> {
        self.entries
            .iter()
            .map(|((level, step, target), message)| PaasStatusMessage {
                level: level.to_string(),
                action: step.to_string(),
                target: target.clone(),
                message: message.clone(),
            })
            .collect()
    }
}

/// Status published for a tenant after a pass.
pub fn build_status(
    recorder: &StatusRecorder,
    quota: BTreeMap<String, Quota>,
) -> PaasStatus {
    PaasStatus {
        messages: recorder.messages(),
        quota,
    }
}
