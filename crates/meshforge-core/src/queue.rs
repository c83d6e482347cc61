//! Bounded inbound queue.
//!
//! Each node owns one queue. The producing half, [`Mailbox`], is cloned into
//! every peer's view of the mesh; the consuming half, [`Inbox`], is handed to
//! whoever drains the node's messages.
//!
//! ## Design
//!
//! - Non-blocking offers: a full or closed queue rejects the message
//!   immediately, and the caller decides whether that counts as a drop.
//! - Single sender: all mailbox clones share one underlying sender. Closing
//!   the mailbox drops it, so the inbox yields what was already buffered and
//!   then ends.

use std::sync::{Arc, PoisonError, RwLock};

use meshforge_proto::Message;
use tokio::sync::{
    Mutex,
    mpsc::{self, error::TryRecvError, error::TrySendError},
};

/// Why a mailbox rejected a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OfferError {
    /// Queue is at capacity
    #[error("queue full")]
    Full,
    /// Queue has been closed
    #[error("queue closed")]
    Closed,
}

/// Create a queue holding at most `capacity` undelivered messages.
///
/// A zero capacity is raised to one.
pub fn bounded(capacity: usize) -> (Mailbox, Inbox) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        Mailbox { sender: Arc::new(RwLock::new(Some(sender))) },
        Inbox { receiver: Arc::new(Mutex::new(receiver)) },
    )
}

/// Producing half of a node's inbound queue.
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: Arc<RwLock<Option<mpsc::Sender<Message>>>>,
}

impl Mailbox {
    /// Enqueue a message without waiting.
    pub fn offer(&self, message: Message) -> Result<(), OfferError> {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(OfferError::Closed);
        };

        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => OfferError::Full,
            TrySendError::Closed(_) => OfferError::Closed,
        })
    }

    /// Close the queue. Idempotent.
    ///
    /// Buffered messages remain readable from the [`Inbox`].
    pub fn close(&self) {
        self.sender.write().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Whether [`Mailbox::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.sender.read().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

/// Consuming half of a node's inbound queue.
///
/// Clones share the same queue; each message is observed by exactly one
/// consumer.
#[derive(Debug, Clone)]
pub struct Inbox {
    receiver: Arc<Mutex<mpsc::Receiver<Message>>>,
}

impl Inbox {
    /// Wait for the next message.
    ///
    /// Returns `None` once the queue is closed and every buffered message has
    /// been received.
    pub async fn recv(&self) -> Option<Message> {
        self.receiver.lock().await.recv().await
    }

    /// Take the next message if one is ready.
    ///
    /// Reports `Empty` while another consumer is waiting in [`Inbox::recv`].
    pub fn try_recv(&self) -> Result<Message, TryRecvError> {
        match self.receiver.try_lock() {
            Ok(mut receiver) => receiver.try_recv(),
            Err(_) => Err(TryRecvError::Empty),
        }
    }

    /// Take every message that is ready.
    pub fn drain(&self) -> Vec<Message> {
        std::iter::from_fn(|| self.try_recv().ok()).collect()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.receiver.try_lock().map_or(0, |receiver| receiver.len())
    }

    /// Whether no message is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use meshforge_proto::MessageType;

    use super::*;

    fn message(payload: &'static str) -> Message {
        Message::new(MessageType::Heartbeat, "node-1", "node-2", payload)
    }

    #[test]
    fn offer_rejects_when_full() {
        let (mailbox, inbox) = bounded(2);

        assert_eq!(mailbox.offer(message("a")), Ok(()));
        assert_eq!(mailbox.offer(message("b")), Ok(()));
        assert_eq!(mailbox.offer(message("c")), Err(OfferError::Full));

        assert_eq!(inbox.len(), 2);
    }

    #[test]
    fn offer_rejects_after_close() {
        let (mailbox, _inbox) = bounded(4);
        let peer_view = mailbox.clone();

        mailbox.close();
        mailbox.close();

        assert!(peer_view.is_closed());
        assert_eq!(peer_view.offer(message("late")), Err(OfferError::Closed));
    }

    #[test]
    fn drain_preserves_order() {
        let (mailbox, inbox) = bounded(8);
        for payload in ["1", "2", "3"] {
            mailbox.offer(message(payload)).expect("offer");
        }

        let payloads: Vec<_> = inbox.drain().into_iter().map(|m| m.payload).collect();

        assert_eq!(payloads, vec!["1", "2", "3"]);
        assert!(inbox.is_empty());
    }

    #[tokio::test]
    async fn close_keeps_buffered_messages() {
        let (mailbox, inbox) = bounded(8);
        mailbox.offer(message("before")).expect("offer");
        mailbox.close();

        let first = inbox.recv().await.expect("buffered message survives close");
        assert_eq!(first.payload, "before");
        assert!(inbox.recv().await.is_none(), "stream ends after close");
        assert_eq!(inbox.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn recv_waits_for_offer() {
        let (mailbox, inbox) = bounded(1);

        let pending = tokio::time::timeout(Duration::from_millis(10), inbox.recv()).await;
        assert!(pending.is_err(), "nothing to receive yet");

        mailbox.offer(message("late")).expect("offer");
        let received = tokio::time::timeout(Duration::from_millis(10), inbox.recv()).await;
        assert!(matches!(received, Ok(Some(_))));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (mailbox, _inbox) = bounded(0);
        assert_eq!(mailbox.offer(message("only")), Ok(()));
        assert_eq!(mailbox.offer(message("extra")), Err(OfferError::Full));
    }
}
