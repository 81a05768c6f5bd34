//! Response mailbox.
//!
//! Inbound application messages for one connection, in arrival order. The
//! engine's reader task pushes; the scenario task waits for the first buffered
//! or newly arriving envelope of a kind that satisfies a predicate.
//!
//! Pushing takes the lock for one `push_back` and wakes waiters through a
//! [`Notify`]. Waiters register for the wake-up *before* scanning, so an
//! envelope that lands between the scan and the suspend is never missed.

use crate::error::MailboxError;
use fix_types::{MessageEnvelope, MessageKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error};

pub const DEFAULT_CAPACITY: usize = 10_000;

/// Outcome of [`Mailbox::await_absence`].
#[derive(Debug, Clone)]
pub enum Absence {
    Absent,
    /// A message of the kind was buffered or arrived; it has been consumed.
    Present(MessageEnvelope),
}

impl Absence {
    pub fn is_absent(&self) -> bool {
        matches!(self, Absence::Absent)
    }
}

#[derive(Default)]
struct Slots {
    queue: VecDeque<MessageEnvelope>,
    dropped: u64,
}

pub struct Mailbox {
    slots: Mutex<Slots>,
    notify: Notify,
    capacity: usize,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append to the tail. Never blocks on consumers.
    ///
    /// At capacity the envelope is refused and the mailbox turns overflowed:
    /// every later wait fails with [`MailboxError::Overflow`].
    pub fn push(&self, envelope: MessageEnvelope) -> Result<(), MailboxError> {
        let result = {
            let mut slots = self.slots.lock();
            if slots.queue.len() >= self.capacity {
                slots.dropped += 1;
                Err(MailboxError::Overflow {
                    capacity: self.capacity,
                    dropped: slots.dropped,
                })
            } else {
                slots.queue.push_back(envelope);
                Ok(())
            }
        };
        if let Err(e) = &result {
            error!(error = %e, "Inbound message refused");
        }
        self.notify.notify_waiters();
        result
    }

    /// Remove and return the first envelope of `kind` accepted by `predicate`,
    /// waiting up to `timeout` for one to arrive.
    pub async fn await_match<P>(
        &self,
        kind: MessageKind,
        predicate: P,
        timeout: Duration,
    ) -> Result<MessageEnvelope, MailboxError>
    where
        P: Fn(&MessageEnvelope) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(envelope) = self.take_first(kind, &predicate)? {
                return Ok(envelope);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                debug!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "Wait timed out");
                return Err(MailboxError::TimedOut {
                    kind,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    /// `Absent` only if no envelope of `kind` is buffered or arrives for the
    /// whole window. A matching envelope is consumed and returned.
    pub async fn await_absence(
        &self,
        kind: MessageKind,
        timeout: Duration,
    ) -> Result<Absence, MailboxError> {
        match self.await_match(kind, |_| true, timeout).await {
            Ok(envelope) => Ok(Absence::Present(envelope)),
            Err(MailboxError::TimedOut { .. }) => Ok(Absence::Absent),
            Err(e) => Err(e),
        }
    }

    /// Drop everything buffered, returning how many envelopes went unread.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.lock();
        let unread = slots.queue.len();
        slots.queue.clear();
        unread
    }

    pub fn len(&self) -> usize {
        self.slots.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Envelopes refused at capacity.
    pub fn dropped(&self) -> u64 {
        self.slots.lock().dropped
    }

    fn take_first<P>(
        &self,
        kind: MessageKind,
        predicate: &P,
    ) -> Result<Option<MessageEnvelope>, MailboxError>
    where
        P: Fn(&MessageEnvelope) -> bool,
    {
        let mut slots = self.slots.lock();
        if slots.dropped > 0 {
            return Err(MailboxError::Overflow {
                capacity: self.capacity,
                dropped: slots.dropped,
            });
        }
        let position = slots
            .queue
            .iter()
            .position(|envelope| envelope.kind() == kind && predicate(envelope));
        Ok(position.and_then(|index| slots.queue.remove(index)))
    }
}
