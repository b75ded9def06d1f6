//! Ingest actor: the writer thread that owns the screen.
//!
//! Clients send [`WriterCommand`]s over a bounded channel. The thread applies
//! tokens to its private [`Screen`] and publishes an immutable
//! [`ScreenSnapshot`] through the [`SnapshotReader`] mailbox whenever the
//! screen changed and the publish interval elapsed, or on request.
//!
//! [`ScreenSnapshot`]: crate::screen::ScreenSnapshot

use super::mailbox::{Delivery, Mailbox, SnapshotReader};
use super::messages::{IngestStats, WriterCommand};
use crate::screen::{Screen, Token};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Configuration for the ingest actor.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Screen columns.
    pub width: usize,
    /// Screen rows.
    pub height: usize,
    /// Lines kept after scrolling off the top.
    pub max_scrollback_lines: usize,
    /// Capacity of the command queue.
    pub token_queue_capacity: usize,
    /// Minimum time between automatic snapshot publications.
    pub publish_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            max_scrollback_lines: 10_000,
            token_queue_capacity: 256,
            publish_interval: Duration::from_millis(16),
        }
    }
}

/// Handle to the ingest thread.
pub struct IngestActor {
    /// Handle to the ingest thread.
    handle: Option<JoinHandle<IngestStats>>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
    /// Command sender.
    commands: Sender<WriterCommand>,
}

impl IngestActor {
    /// Spawn the ingest thread.
    ///
    /// Returns the actor handle and the reader for its snapshots. A first
    /// snapshot of the blank screen is published before any token arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured size is invalid or the OS refuses
    /// to spawn the thread.
    pub fn spawn(config: EngineConfig) -> io::Result<(Self, SnapshotReader)> {
        let screen = Screen::new(config.width, config.height, config.max_scrollback_lines)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let (commands, receiver) = bounded(config.token_queue_capacity.max(1));
        let (mailbox, reader) = Mailbox::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("scrollcell-ingest".to_string())
            .spawn(move || {
                let mut writer = Writer::new(screen, mailbox, config.publish_interval);
                writer.run_loop(&receiver, &shutdown_clone);
                writer.stats
            })?;

        Ok((
            Self {
                handle: Some(handle),
                shutdown,
                commands,
            },
            reader,
        ))
    }

    /// Queue tokens, waiting for room if the queue is full.
    ///
    /// Returns `false` if the ingest thread has stopped.
    pub fn submit(&self, tokens: Vec<Token>) -> bool {
        self.commands.send(WriterCommand::Tokens(tokens)).is_ok()
    }

    /// Queue tokens without waiting. Tokens are dropped if the queue is full.
    pub fn try_submit(&self, tokens: Vec<Token>) -> bool {
        match self.commands.try_send(WriterCommand::Tokens(tokens)) {
            Ok(()) => true,
            Err(TrySendError::Full(WriterCommand::Tokens(dropped))) => {
                warn!(count = dropped.len(), "token queue full, dropping tokens");
                false
            }
            Err(_) => false,
        }
    }

    /// Ask for a snapshot to be published as soon as queued tokens are applied.
    pub fn publish(&self) {
        let _ = self.commands.send(WriterCommand::Publish);
    }

    /// Change the scrollback capacity.
    pub fn set_max_scrollback(&self, lines: usize) {
        let _ = self.commands.send(WriterCommand::SetMaxScrollback(lines));
    }

    /// Signal the ingest thread to stop without draining the queue.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Apply everything queued so far, publish a final snapshot, stop the
    /// thread and wait for it.
    ///
    /// Returns the thread's statistics, or `None` if it panicked.
    pub fn join(mut self) -> Option<IngestStats> {
        let _ = self.commands.send(WriterCommand::Shutdown);
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for IngestActor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

/// State owned by the ingest thread.
struct Writer {
    screen: Screen,
    mailbox: Mailbox,
    publish_interval: Duration,
    started: Instant,
    last_publish: Instant,
    dirty: bool,
    sequence: u64,
    stats: IngestStats,
}

impl Writer {
    fn new(screen: Screen, mailbox: Mailbox, publish_interval: Duration) -> Self {
        let now = Instant::now();
        let mut writer = Self {
            screen,
            mailbox,
            publish_interval,
            started: now,
            last_publish: now,
            dirty: false,
            sequence: 0,
            stats: IngestStats::default(),
        };
        writer.publish();
        writer
    }

    fn run_loop(&mut self, receiver: &Receiver<WriterCommand>, shutdown: &AtomicBool) {
        loop {
            // Check for shutdown
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            let wait = self.publish_interval.saturating_sub(self.last_publish.elapsed());
            match receiver.recv_timeout(wait) {
                Ok(WriterCommand::Tokens(tokens)) => self.apply(&tokens),
                Ok(WriterCommand::Publish) => self.publish(),
                Ok(WriterCommand::SetMaxScrollback(lines)) => {
                    self.screen.set_max_scrollback_lines(lines);
                    self.dirty = true;
                }
                Ok(WriterCommand::Shutdown) => {
                    if self.dirty {
                        self.publish();
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.dirty && self.last_publish.elapsed() >= self.publish_interval {
                self.publish();
            }
        }
        debug!(
            tokens = self.stats.tokens,
            published = self.stats.published,
            superseded = self.stats.superseded,
            "ingest thread stopped"
        );
    }

    fn apply(&mut self, tokens: &[Token]) {
        self.screen.set_time(self.started.elapsed().as_secs_f64());
        for token in tokens {
            if let Token::Gang(gang) = token {
                let bytes: usize = gang.iter().map(|t| t.bytes().len()).sum();
                self.stats.gang_bytes += bytes as u64;
            }
            self.screen.apply(token);
        }
        self.stats.tokens += tokens.len() as u64;
        self.dirty |= !tokens.is_empty();
    }

    fn publish(&mut self) {
        self.sequence += 1;
        let snapshot = Arc::new(self.screen.snapshot().with_sequence(self.sequence));
        match self.mailbox.publish(snapshot) {
            Delivery::Delivered => {}
            Delivery::Superseded => self.stats.superseded += 1,
            Delivery::Disconnected => trace!("no snapshot readers left"),
        }
        self.stats.published += 1;
        self.last_publish = Instant::now();
        self.dirty = false;
        trace!(sequence = self.sequence, "published snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::GangToken;

    fn small() -> EngineConfig {
        EngineConfig {
            width: 10,
            height: 3,
            max_scrollback_lines: 100,
            token_queue_capacity: 4,
            publish_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_initial_snapshot_is_blank() {
        let (actor, mut reader) = IngestActor::spawn(small()).unwrap();
        let first = reader.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(first.sequence(), 1);
        assert_eq!(first.compact_dump(), "..........\n..........\n..........");
        actor.join();
    }

    #[test]
    fn test_join_publishes_final_state() {
        let (actor, mut reader) = IngestActor::spawn(small()).unwrap();
        assert!(actor.submit(vec![Token::text("hello"), Token::CarriageReturnLineFeed]));
        assert!(actor.submit(vec![Token::Gang(vec![GangToken::from_ascii("world").unwrap()])]));
        let stats = actor.join().unwrap();
        assert_eq!(stats.tokens, 3);
        assert_eq!(stats.gang_bytes, 5);
        let last = reader.latest().unwrap();
        assert_eq!(
            last.compact_dump(),
            "hello.....\nworld.....\n.........."
        );
    }

    #[test]
    fn test_rejects_invalid_size() {
        let config = EngineConfig {
            width: 0,
            ..small()
        };
        assert!(IngestActor::spawn(config).is_err());
    }

    #[test]
    fn test_snapshot_survives_later_writes() {
        let (actor, mut reader) = IngestActor::spawn(small()).unwrap();
        actor.submit(vec![Token::text("one")]);
        actor.publish();
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = None;
        while Instant::now() < deadline {
            if let Some(s) = reader.recv_timeout(Duration::from_millis(50)) {
                if s.compact_dump().starts_with("one") {
                    seen = Some(s);
                    break;
                }
            }
        }
        let seen = seen.unwrap();
        actor.submit(vec![Token::CarriageReturn, Token::text("two")]);
        actor.join();
        assert!(seen.compact_dump().starts_with("one......."));
        assert!(reader.latest().unwrap().compact_dump().starts_with("two"));
    }
}
