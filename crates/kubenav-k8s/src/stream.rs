use kubenav_types::ClientError;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Receiving half of a followed log. Lines arrive in order; an `Err` item is
/// always the last one.
pub struct LogStream {
    receiver: mpsc::Receiver<Result<String, ClientError>>,
    cancel: CancellationToken,
}

/// Producing half of a [`LogStream`]
pub struct LogLineSender {
    sender: mpsc::Sender<Result<String, ClientError>>,
    cancel: CancellationToken,
}

impl LogStream {
    /// Create a connected sender/stream pair with a bounded line buffer
    pub fn channel(capacity: usize) -> (LogLineSender, LogStream) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        (
            LogLineSender {
                sender,
                cancel: cancel.clone(),
            },
            LogStream { receiver, cancel },
        )
    }

    /// Wait for the next line. `None` once the producer is done.
    pub async fn next_line(&mut self) -> Option<Result<String, ClientError>> {
        self.receiver.recv().await
    }

    /// Ask the producer to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl LogLineSender {
    /// Deliver one item. Returns false when the stream was dropped or cancelled.
    pub async fn send(&self, item: Result<String, ClientError>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.sender.send(item).await.is_ok()
    }

    /// Resolves once the consumer cancels or drops the stream
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}
