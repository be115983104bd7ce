use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Duration;
use collection::{collector::SignalCollector, RefreshFocus};
use processing::{
    recorder::{DebouncedRecorder, RecorderConfig},
    sanitize::{PresenceTable, Sanitizer},
    ProcessingModule,
};
use storage::{entities::Observation, ndjson::NdjsonSink, sqlite::SqliteSink, AnySink};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    daemon::args::{DaemonArgs, SinkKind},
    signals::{GenericPresenceSystem, GenericWindowSystem, PresenceSystem, WindowSystem},
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

const SQLITE_FILE: &str = "log.sqlite";
const NDJSON_FILE: &str = "log.ndjson";

/// Pipeline settings resolved from the command line.
pub struct DaemonOptions {
    pub sink: SinkKind,
    pub debounce: Duration,
    pub presence: PresenceTable,
}

impl From<&DaemonArgs> for DaemonOptions {
    fn from(args: &DaemonArgs) -> Self {
        Self {
            sink: args.sink,
            debounce: Duration::milliseconds(args.threshold_ms),
            presence: args.presence_order.table(),
        }
    }
}

/// Represents the starting point for the daemon.
pub async fn start_daemon(dir: PathBuf, options: DaemonOptions) -> Result<()> {
    std::env::set_current_dir("/")?;

    let (sender, receiver) = mpsc::channel::<Observation>(16);
    let (refresh_sender, refresh_receiver) = mpsc::channel::<RefreshFocus>(4);

    let windows = GenericWindowSystem::new()?;
    let presence = GenericPresenceSystem::new()?;

    let shutdown_token = CancellationToken::new();

    let collector = create_collector(
        sender,
        refresh_receiver,
        windows,
        presence,
        &shutdown_token,
        DefaultClock,
    );
    let processor = create_processor(
        receiver,
        refresh_sender,
        create_sink(&dir, options.sink),
        &options,
        DefaultClock,
    );

    let (_, collection_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        collector.run(),
        processor.run(),
    );

    if let Err(collection_result) = collection_result {
        error!("Collection module got an error {:?}", collection_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

fn create_sink(dir: &Path, kind: SinkKind) -> AnySink {
    match kind {
        SinkKind::Sqlite => AnySink::Sqlite(SqliteSink::new(dir.join(SQLITE_FILE))),
        SinkKind::Ndjson => AnySink::Ndjson(NdjsonSink::new(dir.join(NDJSON_FILE))),
    }
}

fn create_collector(
    sender: mpsc::Sender<Observation>,
    refresh: mpsc::Receiver<RefreshFocus>,
    windows: impl WindowSystem + 'static,
    presence: impl PresenceSystem + 'static,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> SignalCollector<impl WindowSystem, impl PresenceSystem> {
    SignalCollector::new(
        sender,
        refresh,
        windows,
        presence,
        shutdown_token.clone(),
        Box::new(clock),
    )
}

fn create_processor(
    receiver: mpsc::Receiver<Observation>,
    refresh: mpsc::Sender<RefreshFocus>,
    sink: AnySink,
    options: &DaemonOptions,
    clock: impl Clock,
) -> ProcessingModule<AnySink> {
    ProcessingModule::new(
        receiver,
        refresh,
        Sanitizer::new(options.presence.clone()),
        DebouncedRecorder::new(RecorderConfig::with_debounce(options.debounce)),
        sink,
        Box::new(clock),
    )
}
