use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    daemon::storage::entities::Observation,
    signals::{PresenceSystem, Subscription, WindowSnapshot, WindowSystem},
    utils::clock::Clock,
};

use super::RefreshFocus;

/// Owns the signal sources and their subscription handles, stamps raw
/// notifications into [Observation]s and forwards them to the processing
/// channel. One subscription handle per logical channel (focus, title,
/// status); rebinding overwrites the stored handle, which tears the old
/// subscription down before the new one starts delivering.
pub struct SignalCollector<W, P> {
    next: mpsc::Sender<Observation>,
    refresh: mpsc::Receiver<RefreshFocus>,
    windows: W,
    presence: P,
    title_watch: Option<Subscription>,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl<W: WindowSystem, P: PresenceSystem> SignalCollector<W, P> {
    pub fn new(
        next: mpsc::Sender<Observation>,
        refresh: mpsc::Receiver<RefreshFocus>,
        windows: W,
        presence: P,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            refresh,
            windows,
            presence,
            title_watch: None,
            shutdown,
            clock,
        }
    }

    /// Executes the collector event loop.
    pub async fn run(mut self) -> Result<()> {
        let (focus_sender, mut focus_events) = mpsc::channel::<WindowSnapshot>(8);
        let (title_sender, mut title_events) = mpsc::channel::<WindowSnapshot>(8);
        let (status_sender, mut status_events) = mpsc::channel::<u8>(8);

        let _focus_watch = self.windows.watch_focus(focus_sender)?;
        let _status_watch = self.presence.watch_status(status_sender)?;

        // The window focused at startup counts as the first observation.
        if let Err(e) = self.read_focused_window(&title_sender).await {
            error!("Failed to read the initial focused window {e:?}");
        }

        loop {
            tokio::select! {
                // Cancelation drops every subscription handle and emits no
                // partial record.
                _ = self.shutdown.cancelled() => {
                    self.title_watch = None;
                    return Ok(());
                }
                Some(window) = focus_events.recv() => {
                    self.rebind_title_watch(&window, &title_sender);
                    self.emit_window(&window).await?;
                }
                Some(window) = title_events.recv() => {
                    self.emit_window(&window).await?;
                }
                Some(code) = status_events.recv() => {
                    let observation =
                        Observation::presence(code.to_string(), self.clock.time());
                    self.emit(observation).await?;
                }
                Some(RefreshFocus) = self.refresh.recv() => {
                    if let Err(e) = self.read_focused_window(&title_sender).await {
                        error!("Failed to re-read the focused window {e:?}");
                    }
                }
            }
        }
    }

    async fn read_focused_window(
        &mut self,
        title_sender: &mpsc::Sender<WindowSnapshot>,
    ) -> Result<()> {
        if let Some(window) = self.windows.focused_window()? {
            self.rebind_title_watch(&window, title_sender);
            self.emit_window(&window).await?;
        }
        Ok(())
    }

    fn rebind_title_watch(
        &mut self,
        window: &WindowSnapshot,
        title_sender: &mpsc::Sender<WindowSnapshot>,
    ) {
        // Assignment drops the previous subscription, so the old window
        // cannot keep delivering title changes.
        match self.windows.watch_title(window.id, title_sender.clone()) {
            Ok(subscription) => self.title_watch = Some(subscription),
            Err(e) => {
                error!("Failed to watch titles of {:?} {e:?}", window.id);
                self.title_watch = None;
            }
        }
    }

    async fn emit_window(&mut self, window: &WindowSnapshot) -> Result<()> {
        let observation =
            Observation::window(window.class.clone(), window.title.clone(), self.clock.time());
        self.emit(observation).await
    }

    async fn emit(&mut self, observation: Observation) -> Result<()> {
        debug!("Forwarding observation {:?}", observation);
        self.next
            .send(observation)
            .await
            .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        Ok(())
    }
}
