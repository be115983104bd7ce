use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::daemon::storage::entities::{Observation, ObservationKind};

/// Presence status names in canonical order.
pub const STATUS_NAMES: [&str; 4] = ["available", "invisible", "busy", "idle"];

/// Maps the host session manager's ordinal status codes to names. The true
/// ordering depends on the host's enum and differs between known sources, so
/// it is injected configuration rather than a derived convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceTable {
    names: [&'static str; 4],
}

impl PresenceTable {
    /// Ordering `[available, invisible, busy, idle]`.
    pub fn available_first() -> Self {
        Self {
            names: STATUS_NAMES,
        }
    }

    /// Ordering `[idle, invisible, busy, available]`.
    pub fn idle_first() -> Self {
        Self {
            names: ["idle", "invisible", "busy", "available"],
        }
    }

    pub fn name(&self, code: u8) -> Option<&'static str> {
        self.names.get(code as usize).copied()
    }
}

impl Default for PresenceTable {
    fn default() -> Self {
        Self::available_first()
    }
}

/// Normalizes raw observations into canonical key/value pairs, correcting
/// known noisy sources. Pure: never fails, never mutates shared state, and
/// leaves anything it does not recognize unchanged.
pub struct Sanitizer {
    aliases: Vec<(Regex, &'static str)>,
    /// Interpreter keys remapped by title match, e.g. a generic python
    /// process hosting a drop-down terminal.
    title_aliases: Vec<(&'static str, Regex, &'static str)>,
    suffixes: HashMap<&'static str, &'static str>,
    social: Regex,
    presence: PresenceTable,
}

impl Sanitizer {
    pub fn new(presence: PresenceTable) -> Self {
        Self {
            aliases: vec![(
                Regex::new("(?i)jetbrains-php").unwrap(),
                "jetbrains-phpstorm",
            )],
            title_aliases: vec![("Main.py", Regex::new("(?i)guake").unwrap(), "Guake")],
            suffixes: HashMap::from([
                ("chromium-browser", " – Chromium"),
                ("Firefox", " - Mozilla Firefox"),
                ("jetbrains-phpstorm", " - PhpStorm "),
                ("Smplayer", " - SMPlayer"),
                ("Thunderbird", " - Mozilla Thunderbird"),
            ]),
            social: Regex::new(r"(?i)^\([\d|/]+\)\s+(Twitter|NewsBlur|Facebook)").unwrap(),
            presence,
        }
    }

    pub fn sanitize(&self, observation: Observation) -> Observation {
        match observation.kind {
            ObservationKind::Window => {
                let key = self.sanitize_key(&observation.key, &observation.value);
                let value = self.sanitize_title(&key, &observation.value);
                Observation {
                    key,
                    value,
                    ..observation
                }
            }
            ObservationKind::Presence => {
                let value = self.sanitize_status(&observation.value);
                Observation {
                    value,
                    ..observation
                }
            }
        }
    }

    fn sanitize_key(&self, key: &Arc<str>, title: &str) -> Arc<str> {
        for (pattern, canonical) in &self.aliases {
            if pattern.is_match(key) {
                return Arc::from(*canonical);
            }
        }
        for (raw, title_pattern, canonical) in &self.title_aliases {
            if key.as_ref() == *raw && title_pattern.is_match(title) {
                return Arc::from(*canonical);
            }
        }
        key.clone()
    }

    fn sanitize_title(&self, key: &str, title: &Arc<str>) -> Arc<str> {
        // The application name is already in the key, drop it from the title.
        let stripped = match self.suffixes.get(key).and_then(|suffix| title.find(suffix)) {
            Some(at) => title[..at].trim(),
            None => title.as_ref(),
        };

        // Unread counters make every notification a distinct title.
        if let Some(captures) = self.social.captures(stripped) {
            if let Some(name) = captures.get(1) {
                return Arc::from(name.as_str());
            }
        }

        if stripped.len() == title.len() {
            title.clone()
        } else {
            Arc::from(stripped)
        }
    }

    fn sanitize_status(&self, value: &Arc<str>) -> Arc<str> {
        match value.parse::<u8>().ok().and_then(|code| self.presence.name(code)) {
            Some(name) => Arc::from(name),
            None => value.clone(),
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(PresenceTable::default())
    }
}
