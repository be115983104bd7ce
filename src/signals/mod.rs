//! Contracts for the platform signal sources: the windowing system (focus
//! and title notifications) and the presence system (idle/busy status
//! notifications). Backends are host-specific and live outside this crate;
//! [GenericWindowSystem] and [GenericPresenceSystem] are the facades the
//! daemon wires against.

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Stable identity of a window for the lifetime of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// What a windowing backend exposes about the focused window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub id: WindowId,
    /// Application class, e.g. 'Firefox' or 'jetbrains-phpstorm'.
    pub class: Arc<str>,
    pub title: Arc<str>,
}

/// Owned handle to a live signal subscription. Dropping the handle tears the
/// subscription down, so rebinding a channel is a single atomic operation:
/// overwrite the stored handle and the old subscription dies with it. This
/// replaces loose callback-id bookkeeping, where a handle can be leaked or
/// disconnected twice.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Token a backend task should watch to know the subscriber is gone.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Contract a windowing backend must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowSystem: Send {
    /// Reads the currently focused window, if any.
    fn focused_window(&mut self) -> Result<Option<WindowSnapshot>>;

    /// Delivers a snapshot on every focus change until the subscription is
    /// dropped.
    fn watch_focus(&mut self, notify: mpsc::Sender<WindowSnapshot>) -> Result<Subscription>;

    /// Delivers a snapshot on every title change of the given window until
    /// the subscription is dropped.
    fn watch_title(
        &mut self,
        window: WindowId,
        notify: mpsc::Sender<WindowSnapshot>,
    ) -> Result<Subscription>;
}

/// Contract a presence backend must implement. Status values are the raw
/// ordinal codes of the host session manager; mapping codes to names is
/// configuration owned by the sanitizer.
#[cfg_attr(test, mockall::automock)]
pub trait PresenceSystem: Send {
    /// Delivers an ordinal status code on every presence change until the
    /// subscription is dropped.
    fn watch_status(&mut self, notify: mpsc::Sender<u8>) -> Result<Subscription>;
}

/// Facade over platform windowing backends.
pub struct GenericWindowSystem {
    inner: Box<dyn WindowSystem>,
}

impl GenericWindowSystem {
    pub fn new() -> Result<Self> {
        // Backends are provided by the embedding host. Building the bare
        // daemon without one keeps the crate compilable and testable.
        bail!("no windowing backend is compiled into this build")
    }

    /// Wraps a host-provided backend.
    pub fn from_backend(inner: Box<dyn WindowSystem>) -> Self {
        Self { inner }
    }
}

impl WindowSystem for GenericWindowSystem {
    fn focused_window(&mut self) -> Result<Option<WindowSnapshot>> {
        self.inner.focused_window()
    }

    fn watch_focus(&mut self, notify: mpsc::Sender<WindowSnapshot>) -> Result<Subscription> {
        self.inner.watch_focus(notify)
    }

    fn watch_title(
        &mut self,
        window: WindowId,
        notify: mpsc::Sender<WindowSnapshot>,
    ) -> Result<Subscription> {
        self.inner.watch_title(window, notify)
    }
}

/// Facade over platform presence backends.
pub struct GenericPresenceSystem {
    inner: Box<dyn PresenceSystem>,
}

impl GenericPresenceSystem {
    pub fn new() -> Result<Self> {
        bail!("no presence backend is compiled into this build")
    }

    /// Wraps a host-provided backend.
    pub fn from_backend(inner: Box<dyn PresenceSystem>) -> Self {
        Self { inner }
    }
}

impl PresenceSystem for GenericPresenceSystem {
    fn watch_status(&mut self, notify: mpsc::Sender<u8>) -> Result<Subscription> {
        self.inner.watch_status(notify)
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::Subscription;

    #[test]
    fn dropping_a_subscription_cancels_it() {
        let token = CancellationToken::new();
        let subscription = Subscription::new(token.clone());
        assert!(subscription.is_active());
        drop(subscription);
        assert!(token.is_cancelled());
    }

    #[test]
    fn replacing_a_subscription_cancels_only_the_old_one() {
        let first_token = CancellationToken::new();
        let second_token = CancellationToken::new();

        let mut slot = Some(Subscription::new(first_token.clone()));
        assert!(slot.as_ref().is_some_and(Subscription::is_active));
        slot = Some(Subscription::new(second_token.clone()));

        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
        drop(slot);
        assert!(second_token.is_cancelled());
    }
}
