use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::sync::Arc;

/// What a raw notification was about.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    Window,
    Presence,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Window => "window",
            ObservationKind::Presence => "presence",
        }
    }
}

/// Provenance tag on a stored entry.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Window,
    Presence,
    #[default]
    External,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Window => "window",
            Origin::Presence => "presence",
            Origin::External => "external",
        }
    }
}

impl From<ObservationKind> for Origin {
    fn from(kind: ObservationKind) -> Self {
        match kind {
            ObservationKind::Window => Origin::Window,
            ObservationKind::Presence => Origin::Presence,
        }
    }
}

/// A single raw focus/title/presence notification, stamped at collection
/// time. Observations only live between the signal source and the recorder,
/// they are never persisted directly.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Observation {
    pub kind: ObservationKind,
    /// Application class for window observations, `"status"` for presence.
    pub key: Arc<str>,
    /// Window title or presence status text.
    pub value: Arc<str>,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn window(
        key: impl Into<Arc<str>>,
        value: impl Into<Arc<str>>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: ObservationKind::Window,
            key: key.into(),
            value: value.into(),
            timestamp,
        }
    }

    pub fn presence(value: impl Into<Arc<str>>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: ObservationKind::Presence,
            key: "status".into(),
            value: value.into(),
            timestamp,
        }
    }
}

/// The one in-flight record awaiting its duration. At most one instance
/// exists at any time, owned by the recorder.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct PendingRecord {
    pub date: DateTime<Utc>,
    pub timezone: String,
    pub kind: ObservationKind,
    pub key: Arc<str>,
    pub value: Arc<str>,
    pub origin: Origin,
}

impl PendingRecord {
    pub fn adopt(observation: &Observation, now: DateTime<Utc>, timezone: &str) -> Self {
        Self {
            date: now,
            timezone: timezone.to_owned(),
            kind: observation.kind,
            key: observation.key.clone(),
            value: observation.value.clone(),
            origin: observation.kind.into(),
        }
    }

    /// Whether the incoming observation describes the same state as this
    /// record.
    pub fn matches(&self, observation: &Observation) -> bool {
        self.kind == observation.kind
            && self.key == observation.key
            && self.value == observation.value
    }

    /// Consumes the pending record, fixing its duration in seconds with
    /// millisecond precision.
    pub fn finalize(self, elapsed: chrono::Duration) -> LogEntry {
        LogEntry {
            date: self.date,
            timezone: self.timezone,
            kind: self.kind,
            key: self.key,
            value: self.value,
            duration: Some(elapsed.num_milliseconds() as f64 / 1000.0),
            origin: self.origin,
        }
    }
}

/// An immutable, duration-finalized activity record. This is the only shape
/// that reaches a store.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub date: DateTime<Utc>,
    pub timezone: String,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    pub key: Arc<str>,
    pub value: Arc<str>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub origin: Origin,
}
