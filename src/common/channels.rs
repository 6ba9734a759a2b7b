//! Channel type definitions for inter-task communication

use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of the refresh-signal channel: at most one pending refresh
pub const REFRESH_CHANNEL_SIZE: usize = 1;

/// Signal telling the supervisor the universe was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSignal {
    /// Generation number of the new universe
    pub generation: u64,
}

/// Create the refresh-signal channel
pub fn create_refresh_channel() -> (RefreshSender, mpsc::Receiver<RefreshSignal>) {
    let (tx, rx) = mpsc::channel(REFRESH_CHANNEL_SIZE);
    (RefreshSender { inner: tx }, rx)
}

/// Sending half of the refresh channel that coalesces overflowing signals
#[derive(Debug, Clone)]
pub struct RefreshSender {
    inner: mpsc::Sender<RefreshSignal>,
}

impl RefreshSender {
    /// Queue a refresh signal
    ///
    /// Returns `false` when a refresh is already pending (the signal is
    /// coalesced into it) or when the supervisor has gone away.
    pub fn notify(&self, signal: RefreshSignal) -> bool {
        match self.inner.try_send(signal) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(generation = signal.generation, "Refresh already pending, coalescing");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(generation = signal.generation, "Refresh receiver closed");
                false
            }
        }
    }
}
