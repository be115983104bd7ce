use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tracing::{debug, info};

use crate::daemon::storage::entities::{LogEntry, Observation, ObservationKind, PendingRecord};

/// Recorder tuning. The on/off patterns are a deliberate command side
/// channel: an observation whose value matches one of them toggles logging
/// for the whole process instead of being recorded.
pub struct RecorderConfig {
    /// Transitions faster than this are treated as flicker.
    pub debounce: Duration,
    pub enable_pattern: Regex,
    pub disable_pattern: Regex,
    /// Presence status name that means the user became active again. An
    /// observation carrying it asks for a fresh read of the focused window.
    pub active_status: String,
}

pub const DEFAULT_DEBOUNCE_MS: i64 = 125;

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::milliseconds(DEFAULT_DEBOUNCE_MS),
            enable_pattern: Regex::new(r"on\.timetrack\.dev").unwrap(),
            disable_pattern: Regex::new(r"off\.timetrack\.dev").unwrap(),
            active_status: "available".to_owned(),
        }
    }
}

impl RecorderConfig {
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            ..Self::default()
        }
    }
}

/// What [DebouncedRecorder::accept] decided.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    /// Finalized record for the *previous* state, ready to persist.
    pub entry: Option<LogEntry>,
    /// The user just became active; the focused window should be re-read.
    pub refresh_focus: bool,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }
}

/// The single stateful decision point of the pipeline: a deterministic
/// reducer over `(state, observation, now)` that holds at most one pending
/// record and emits at most one finalized entry per accepted transition.
/// Performs no I/O, so it is unit-testable without any environment.
pub struct DebouncedRecorder {
    config: RecorderConfig,
    pending: Option<PendingRecord>,
    enabled: bool,
}

impl DebouncedRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            pending: None,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Feeds one sanitized observation through the state machine. `now` and
    /// `timezone` come from the caller's clock so the reducer stays
    /// deterministic.
    pub fn accept(
        &mut self,
        observation: &Observation,
        now: DateTime<Utc>,
        timezone: &str,
    ) -> Outcome {
        if self.apply_toggle(&observation.value) {
            return Outcome::none();
        }
        if !self.enabled {
            return Outcome::none();
        }

        let refresh_focus = observation.kind == ObservationKind::Presence
            && observation.value.as_ref() == self.config.active_status;

        if let Some(pending) = &self.pending {
            // Pure flicker, the state did not actually change.
            if pending.matches(observation) {
                return Outcome {
                    entry: None,
                    refresh_focus,
                };
            }
            // Titleless transient windows of the same application.
            if observation.value.is_empty() && pending.key == observation.key {
                return Outcome {
                    entry: None,
                    refresh_focus,
                };
            }

            let elapsed = now - pending.date;
            if elapsed < self.config.debounce {
                // The previous transition was itself flicker; dropping this
                // observation lets the next genuine change self-correct it.
                debug!(
                    "Dropping observation after {}ms, below debounce threshold",
                    elapsed.num_milliseconds()
                );
                return Outcome {
                    entry: None,
                    refresh_focus,
                };
            }

            let finalized = self
                .pending
                .take()
                .map(|pending| pending.finalize(elapsed));
            self.pending = Some(PendingRecord::adopt(observation, now, timezone));
            return Outcome {
                entry: finalized,
                refresh_focus,
            };
        }

        self.pending = Some(PendingRecord::adopt(observation, now, timezone));
        Outcome {
            entry: None,
            refresh_focus,
        }
    }

    /// Handles the sentinel command channel. Returns true when the
    /// observation was a command and must not be recorded.
    fn apply_toggle(&mut self, value: &str) -> bool {
        if self.config.enable_pattern.is_match(value) {
            info!("Turning logging on");
            self.enabled = true;
            self.pending = None;
            return true;
        }
        if self.config.disable_pattern.is_match(value) {
            info!("Turning logging off");
            self.enabled = false;
            self.pending = None;
            return true;
        }
        false
    }
}

impl Default for DebouncedRecorder {
    fn default() -> Self {
        Self::new(RecorderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::daemon::storage::entities::{Observation, ObservationKind, Origin};

    use super::{DebouncedRecorder, Outcome};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn start() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    fn at_ms(offset: i64) -> DateTime<Utc> {
        start() + Duration::milliseconds(offset)
    }

    fn window(key: &str, value: &str, at: DateTime<Utc>) -> Observation {
        Observation::window(key, value, at)
    }

    fn feed(recorder: &mut DebouncedRecorder, observation: Observation) -> Outcome {
        let now = observation.timestamp;
        recorder.accept(&observation, now, "CET")
    }

    #[test]
    fn first_observation_is_adopted_without_emission() {
        let mut recorder = DebouncedRecorder::default();
        let outcome = feed(&mut recorder, window("Firefox", "Inbox", start()));
        assert_eq!(outcome.entry, None);
        assert!(!outcome.refresh_focus);
    }

    #[test]
    fn identical_observations_never_emit() {
        let mut recorder = DebouncedRecorder::default();
        for offset in [0, 500, 1000, 5000] {
            let outcome = feed(&mut recorder, window("Firefox", "Inbox", at_ms(offset)));
            assert_eq!(outcome.entry, None);
        }

        // The pending record is still the original one: a distinct change
        // finalizes it with the full elapsed time.
        let outcome = feed(&mut recorder, window("Gedit", "notes", at_ms(6000)));
        let entry = outcome.entry.unwrap();
        assert_eq!(entry.key.as_ref(), "Firefox");
        assert_eq!(entry.duration, Some(6.0));
    }

    #[test]
    fn distinct_transition_finalizes_previous_record() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, window("Firefox", "Inbox", start()));
        let outcome = feed(&mut recorder, window("Gedit", "notes", at_ms(2000)));

        let entry = outcome.entry.unwrap();
        assert_eq!(entry.kind, ObservationKind::Window);
        assert_eq!(entry.key.as_ref(), "Firefox");
        assert_eq!(entry.value.as_ref(), "Inbox");
        assert_eq!(entry.duration, Some(2.0));
        assert_eq!(entry.origin, Origin::Window);
        assert_eq!(entry.date, start());
        assert_eq!(entry.timezone, "CET");
    }

    #[test]
    fn transition_below_threshold_is_dropped_and_self_corrects() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, window("Firefox", "Inbox", start()));

        // 50ms < 125ms threshold: B is dropped entirely, A stays pending.
        let outcome = feed(&mut recorder, window("Gedit", "notes", at_ms(50)));
        assert_eq!(outcome.entry, None);

        // C finalizes A with the full 300ms, not 250ms from B.
        let outcome = feed(&mut recorder, window("Guake", "term", at_ms(300)));
        let entry = outcome.entry.unwrap();
        assert_eq!(entry.key.as_ref(), "Firefox");
        assert_eq!(entry.duration, Some(0.3));
    }

    #[test]
    fn duration_keeps_millisecond_precision() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, window("Firefox", "Inbox", start()));
        let outcome = feed(&mut recorder, window("Gedit", "notes", at_ms(1234)));
        assert_eq!(outcome.entry.unwrap().duration, Some(1.234));
    }

    #[test]
    fn empty_title_for_same_application_is_dropped() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, window("Guake", "term", start()));
        let outcome = feed(&mut recorder, window("Guake", "", at_ms(2000)));
        assert_eq!(outcome.entry, None);

        // The pending record is untouched.
        let outcome = feed(&mut recorder, window("Gedit", "notes", at_ms(3000)));
        let entry = outcome.entry.unwrap();
        assert_eq!(entry.value.as_ref(), "term");
        assert_eq!(entry.duration, Some(3.0));
    }

    #[test]
    fn empty_title_for_a_different_application_is_a_transition() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, window("Firefox", "Inbox", start()));
        let outcome = feed(&mut recorder, window("Gedit", "", at_ms(2000)));
        assert_eq!(outcome.entry.unwrap().key.as_ref(), "Firefox");
    }

    #[test]
    fn disable_sentinel_clears_pending_and_suppresses_logging() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, window("Firefox", "Inbox", start()));

        let outcome = feed(
            &mut recorder,
            Observation::presence("off.timetrack.dev", at_ms(1000)),
        );
        assert_eq!(outcome.entry, None);
        assert!(!recorder.is_enabled());

        // Nothing is recorded while disabled, not even new pending state.
        let outcome = feed(&mut recorder, window("Gedit", "notes", at_ms(2000)));
        assert_eq!(outcome.entry, None);
        let outcome = feed(&mut recorder, window("Guake", "term", at_ms(4000)));
        assert_eq!(outcome.entry, None);
    }

    #[test]
    fn enable_sentinel_restores_logging_with_a_clean_slate() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, window("Firefox", "Inbox", start()));
        feed(
            &mut recorder,
            Observation::presence("off.timetrack.dev", at_ms(1000)),
        );
        let outcome = feed(
            &mut recorder,
            Observation::presence("on.timetrack.dev", at_ms(5000)),
        );
        assert_eq!(outcome.entry, None);
        assert!(recorder.is_enabled());

        // First observation after re-enabling starts a fresh pending record;
        // the pre-toggle state was discarded, never emitted.
        let outcome = feed(&mut recorder, window("Gedit", "notes", at_ms(6000)));
        assert_eq!(outcome.entry, None);
        let outcome = feed(&mut recorder, window("Guake", "term", at_ms(8000)));
        let entry = outcome.entry.unwrap();
        assert_eq!(entry.key.as_ref(), "Gedit");
        assert_eq!(entry.duration, Some(2.0));
    }

    #[test]
    fn active_status_requests_a_focus_refresh() {
        let mut recorder = DebouncedRecorder::default();
        let outcome = feed(&mut recorder, Observation::presence("available", start()));
        assert!(outcome.refresh_focus);

        // A repeated active status is a duplicate but still refreshes.
        let outcome = feed(&mut recorder, Observation::presence("available", at_ms(1000)));
        assert_eq!(outcome.entry, None);
        assert!(outcome.refresh_focus);

        let outcome = feed(&mut recorder, Observation::presence("idle", at_ms(2000)));
        assert!(!outcome.refresh_focus);
        assert_eq!(outcome.entry.unwrap().value.as_ref(), "available");
    }

    #[test]
    fn window_observations_never_request_a_refresh() {
        let mut recorder = DebouncedRecorder::default();
        let outcome = feed(&mut recorder, window("Firefox", "available", start()));
        assert!(!outcome.refresh_focus);
    }

    #[test]
    fn presence_and_window_records_carry_their_origin() {
        let mut recorder = DebouncedRecorder::default();
        feed(&mut recorder, Observation::presence("idle", start()));
        let outcome = feed(&mut recorder, window("Firefox", "Inbox", at_ms(2000)));
        assert_eq!(outcome.entry.unwrap().origin, Origin::Presence);

        let outcome = feed(&mut recorder, Observation::presence("busy", at_ms(4000)));
        assert_eq!(outcome.entry.unwrap().origin, Origin::Window);
    }
}
