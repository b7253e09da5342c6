//! Cancellable chaincode event subscriptions.
//!
//! A subscription is a lazily produced, non-restartable sequence of events.
//! The producing side holds an [`EventSender`]; the consuming side holds the
//! [`ChaincodeEventStream`]. Either side can end it: the producer by dropping
//! its sender, the consumer by cancelling or dropping the stream.

use chainperm_core::event::ChaincodeEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Triggers cancellation of one subscription. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// `true` once the subscription was cancelled or both of its halves have
    /// been dropped.
    pub fn is_ended(&self) -> bool {
        self.is_cancelled() || self.tx.is_closed()
    }
}

/// Producer half of a subscription.
#[derive(Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ChaincodeEvent>,
    cancel: watch::Receiver<bool>,
}

impl EventSender {
    /// Deliver an event. Returns `false` once the subscription has ended, in
    /// which case the producer should stop.
    pub fn send(&self, event: ChaincodeEvent) -> bool {
        !self.is_closed() && self.tx.send(event).is_ok()
    }

    /// `true` if the consumer cancelled or dropped the stream.
    pub fn is_closed(&self) -> bool {
        *self.cancel.borrow() || self.tx.is_closed()
    }

    /// Resolves when the consumer cancels or drops the stream.
    pub async fn closed(&mut self) {
        tokio::select! {
            _ = self.tx.closed() => {}
            _ = wait_cancelled(&mut self.cancel) => {}
        }
    }
}

/// Consumer half of a subscription.
#[derive(Debug)]
pub struct ChaincodeEventStream {
    rx: mpsc::UnboundedReceiver<ChaincodeEvent>,
    cancel: watch::Receiver<bool>,
    cancel_tx: Arc<watch::Sender<bool>>,
    finished: bool,
}

impl ChaincodeEventStream {
    /// Create a connected sender/stream pair.
    pub fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel) = watch::channel(false);
        let sender = EventSender {
            tx,
            cancel: cancel.clone(),
        };
        let stream = Self {
            rx,
            cancel,
            cancel_tx: Arc::new(cancel_tx),
            finished: false,
        };
        (sender, stream)
    }

    /// Wait for the next event, in delivery order.
    ///
    /// Returns `None` once the subscription is cancelled or the producer has
    /// gone away, and keeps returning `None` afterwards. Cancellation wins
    /// over events that are already queued.
    pub async fn next(&mut self) -> Option<ChaincodeEvent> {
        if self.finished {
            return None;
        }

        let next = tokio::select! {
            biased;
            _ = wait_cancelled(&mut self.cancel) => None,
            event = self.rx.recv() => event,
        };

        if next.is_none() {
            self.finish();
        }
        next
    }

    /// A handle that can cancel this subscription from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    pub fn cancel(&mut self) {
        self.cancel_tx.send_replace(true);
        self.finish();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        self.rx.close();
    }
}

async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|c| *c).await.map(|_| ());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(tx: &str) -> ChaincodeEvent {
        ChaincodeEvent::new(tx, "CreateAsset", b"{}".to_vec())
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let (sender, mut stream) = ChaincodeEventStream::channel();
        for tx in ["t1", "t2", "t3"] {
            assert!(sender.send(ev(tx)));
        }
        for tx in ["t1", "t2", "t3"] {
            assert_eq!(stream.next().await.unwrap().transaction_id, tx);
        }
    }

    #[tokio::test]
    async fn producer_drop_ends_stream() {
        let (sender, mut stream) = ChaincodeEventStream::channel();
        sender.send(ev("t1"));
        drop(sender);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
        assert!(stream.is_finished());
    }

    #[tokio::test]
    async fn cancel_from_another_task() {
        let (sender, mut stream) = ChaincodeEventStream::channel();
        let handle = stream.cancel_handle();

        let waiter = tokio::spawn(async move { stream.next().await });
        handle.cancel();

        assert!(waiter.await.unwrap().is_none());
        assert!(sender.is_closed());
        assert!(!sender.send(ev("late")));
    }

    #[test]
    fn handle_reports_end() {
        let (sender, stream) = ChaincodeEventStream::channel();
        let handle = stream.cancel_handle();
        assert!(!handle.is_ended());

        drop(stream);
        assert!(!handle.is_ended());
        drop(sender);
        assert!(handle.is_ended());
        assert!(!handle.is_cancelled());

        let (_sender, stream) = ChaincodeEventStream::channel();
        let handle = stream.cancel_handle();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(handle.is_ended());
    }

    #[tokio::test]
    async fn producer_observes_cancel() {
        let (mut sender, mut stream) = ChaincodeEventStream::channel();
        stream.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), sender.closed())
            .await
            .expect("producer should observe cancellation");
        assert!(stream.next().await.is_none());
    }
}
