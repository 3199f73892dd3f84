//! Broadcast stop signal.
//!
//! The signal is a zero-capacity channel that nobody ever sends on. Signalling
//! drops the only sender, which disconnects the channel for every receiver at
//! once, so any number of loops can `select!` on their own [`StopToken`] and
//! all of them wake up.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

pub struct StopSignal {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    pub fn token(&self) -> StopToken {
        StopToken {
            receiver: self.receiver.clone(),
        }
    }

    /// Signal every token. Returns `false` if the signal had already fired.
    pub fn signal(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    pub fn is_signaled(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

/// Observer side of a [`StopSignal`].
#[derive(Clone, Debug)]
pub struct StopToken {
    receiver: Receiver<()>,
}

impl StopToken {
    /// Receiver to place in a `select!`; it becomes ready once stopped.
    #[inline]
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }
}
