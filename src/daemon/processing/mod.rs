use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{
    daemon::{
        collection::RefreshFocus,
        storage::{entities::Observation, sink::LogSink},
    },
    utils::clock::Clock,
};

use self::{recorder::DebouncedRecorder, sanitize::Sanitizer};

pub mod recorder;
pub mod sanitize;

/// Consumes the observation channel and drives each observation to
/// completion: sanitize, feed the recorder, persist whatever it finalized.
/// Observations are never evaluated concurrently against the pending-record
/// state; this module is the single logical writer of the sink.
pub struct ProcessingModule<S> {
    receiver: mpsc::Receiver<Observation>,
    refresh: mpsc::Sender<RefreshFocus>,
    sanitizer: Sanitizer,
    recorder: DebouncedRecorder,
    sink: S,
    clock: Box<dyn Clock>,
}

impl<S: LogSink> ProcessingModule<S> {
    pub fn new(
        receiver: mpsc::Receiver<Observation>,
        refresh: mpsc::Sender<RefreshFocus>,
        sanitizer: Sanitizer,
        recorder: DebouncedRecorder,
        sink: S,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            receiver,
            refresh,
            sanitizer,
            recorder,
            sink,
            clock,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(observation) = self.receiver.recv().await {
            debug!("Processing observation {:?}", observation);

            let timezone = self.clock.timezone();
            let observation = self.sanitizer.sanitize(observation);
            let outcome = self
                .recorder
                .accept(&observation, observation.timestamp, &timezone);

            if let Some(entry) = outcome.entry {
                // A failed append loses the entry; there is no retry.
                if let Err(e) = self.sink.append(entry).await {
                    error!("Failed to persist log entry: {e:?}");
                }
            }

            if outcome.refresh_focus {
                // The collector may already be gone during shutdown.
                let _ = self.refresh.try_send(RefreshFocus);
            }
        }

        self.receiver.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    use crate::{
        daemon::{
            processing::{
                recorder::DebouncedRecorder,
                sanitize::Sanitizer,
            },
            storage::{
                entities::{LogEntry, Observation},
                ndjson::NdjsonSink,
            },
        },
        utils::clock::Clock,
    };

    use super::ProcessingModule;

    struct FrozenClock;

    impl Clock for FrozenClock {
        fn time(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap()
        }

        fn timezone(&self) -> String {
            "CET".to_owned()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap()
    }

    async fn run_pipeline(observations: Vec<Observation>) -> Result<Vec<LogEntry>> {
        let dir = tempdir()?;
        let path = dir.path().join("log.ndjson");

        let (sender, receiver) = mpsc::channel(16);
        let (refresh_sender, _refresh_receiver) = mpsc::channel(4);
        let module = ProcessingModule::new(
            receiver,
            refresh_sender,
            Sanitizer::default(),
            DebouncedRecorder::default(),
            NdjsonSink::new(path.clone()),
            Box::new(FrozenClock),
        );

        for observation in observations {
            sender.send(observation).await?;
        }
        drop(sender);
        module.run().await?;

        let contents = tokio::fs::read_to_string(&path)
            .await
            .unwrap_or_default();
        Ok(contents
            .lines()
            .map(serde_json::from_str::<LogEntry>)
            .collect::<Result<Vec<_>, _>>()?)
    }

    #[tokio::test]
    async fn suffix_stripped_titles_collapse_into_one_state() -> Result<()> {
        // Both titles sanitize to "Inbox", so the second observation is a
        // pure duplicate and nothing is ever finalized.
        let entries = run_pipeline(vec![
            Observation::window("Firefox", "Inbox - Mozilla Firefox", start()),
            Observation::window("Firefox", "Inbox", start() + Duration::seconds(1)),
        ])
        .await?;

        assert_eq!(entries, vec![]);
        Ok(())
    }

    #[tokio::test]
    async fn distinct_states_produce_duration_annotated_entries() -> Result<()> {
        let entries = run_pipeline(vec![
            Observation::window("Firefox", "Inbox", start()),
            Observation::window("Gedit", "notes", start() + Duration::seconds(2)),
            Observation::window("Guake", "term", start() + Duration::seconds(5)),
        ])
        .await?;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value.as_ref(), "Inbox");
        assert_eq!(entries[0].duration, Some(2.0));
        assert_eq!(entries[0].timezone, "CET");
        assert_eq!(entries[1].value.as_ref(), "notes");
        assert_eq!(entries[1].duration, Some(3.0));
        Ok(())
    }

    #[tokio::test]
    async fn sentinel_observations_are_never_persisted() -> Result<()> {
        let entries = run_pipeline(vec![
            Observation::window("Firefox", "Inbox", start()),
            Observation::presence("off.timetrack.dev", start() + Duration::seconds(1)),
            Observation::window("Gedit", "notes", start() + Duration::seconds(2)),
        ])
        .await?;

        assert_eq!(entries, vec![]);
        Ok(())
    }
}
