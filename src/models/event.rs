// ABOUTME: Progress event model carried on the event bus between a pipeline and its presentation sink

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Running,
    Success,
    Error,
    Info,
    Skipped,
}

impl EventStatus {
    /// Symbol shown in front of the event line.
    pub fn indicator(&self) -> &'static str {
        match self {
            EventStatus::Running => "…",
            EventStatus::Success => "✓",
            EventStatus::Error => "✗",
            EventStatus::Info => "ℹ",
            EventStatus::Skipped => "-",
        }
    }

    /// Every status except `Running` closes a step.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventStatus::Running)
    }
}

/// One progress report. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub key: String,
    pub name: String,
    pub status: EventStatus,
    pub message: String,
}

impl Event {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        status: EventStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}
