//! Single-slot snapshot mailbox.
//!
//! The writer publishes `Arc<ScreenSnapshot>` into a `bounded(1)` channel.
//! If the slot is still occupied the writer takes the stale snapshot out
//! through its own receiver clone and puts the fresh one in, so publishing
//! never waits for a reader and readers only ever see the newest state.

use crate::screen::ScreenSnapshot;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

/// Writer half.
#[derive(Debug)]
pub(crate) struct Mailbox {
    tx: Sender<Arc<ScreenSnapshot>>,
    drain: Receiver<Arc<ScreenSnapshot>>,
}

/// What happened to a published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The slot was empty.
    Delivered,
    /// An unread snapshot was replaced.
    Superseded,
    /// Every reader is gone.
    Disconnected,
}

impl Mailbox {
    pub(crate) fn new() -> (Self, SnapshotReader) {
        let (tx, rx) = bounded(1);
        let mailbox = Self {
            tx,
            drain: rx.clone(),
        };
        (mailbox, SnapshotReader::new(rx))
    }

    pub(crate) fn publish(&self, snapshot: Arc<ScreenSnapshot>) -> Delivery {
        match self.tx.try_send(snapshot) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(snapshot)) => {
                let stale = self.drain.try_recv().is_ok();
                match self.tx.try_send(snapshot) {
                    // A reader emptied the slot in between.
                    Ok(()) if !stale => Delivery::Delivered,
                    Ok(()) | Err(TrySendError::Full(_)) => Delivery::Superseded,
                    Err(TrySendError::Disconnected(_)) => Delivery::Disconnected,
                }
            }
            Err(TrySendError::Disconnected(_)) => Delivery::Disconnected,
        }
    }
}

/// Reader half: hands out the newest published snapshot.
///
/// There is exactly one reader per actor and it is not `Clone`: the
/// single-slot channel hands each snapshot to one receiver only. Several
/// consumers share one reader (for example behind a `Mutex`) or pass the
/// `Arc<ScreenSnapshot>` it returns along to each other.
#[derive(Debug)]
pub struct SnapshotReader {
    rx: Receiver<Arc<ScreenSnapshot>>,
    current: Option<Arc<ScreenSnapshot>>,
}

impl SnapshotReader {
    const fn new(rx: Receiver<Arc<ScreenSnapshot>>) -> Self {
        Self { rx, current: None }
    }

    /// The newest snapshot seen so far, checking for a fresh one first.
    ///
    /// Never blocks. `None` until the writer has published once.
    pub fn latest(&mut self) -> Option<Arc<ScreenSnapshot>> {
        while let Ok(snapshot) = self.rx.try_recv() {
            self.current = Some(snapshot);
        }
        self.current.clone()
    }

    /// Wait up to `timeout` for a snapshot newer than the last one seen.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Arc<ScreenSnapshot>> {
        match self.rx.recv_timeout(timeout) {
            Ok(snapshot) => {
                self.current = Some(Arc::clone(&snapshot));
                Some(snapshot)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}
