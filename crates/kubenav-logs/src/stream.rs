use kubenav_k8s::ResourceClient;
use kubenav_types::LogTarget;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Event produced by a log stream, tagged with the id of the stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEvent {
    pub stream: u64,
    pub kind: StreamEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEventKind {
    /// One received line
    Line(String),
    /// The stream finished, with an error message if it failed
    Ended(Option<String>),
}

/// Manages the single active log stream
pub struct LogStreamManager {
    /// Cancellation token for stopping the stream
    cancel: CancellationToken,

    /// Active stream task handle
    task: Option<tokio::task::JoinHandle<()>>,
}

impl LogStreamManager {
    /// Create a new log stream manager
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Start following `target`, replacing any running stream
    pub fn start<C: ResourceClient>(
        &mut self,
        client: C,
        target: LogTarget,
        tail: i64,
        stream: u64,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) {
        self.stop();
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(async move {
            let mut lines = client.stream_log(&target, tail);

            let end = loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,

                    next = lines.next_line() => {
                        match next {
                            Some(Ok(line)) => {
                                let event = StreamEvent { stream, kind: StreamEventKind::Line(line) };
                                if events.send(event).is_err() {
                                    // Receiver gone, stop streaming
                                    return;
                                }
                            }
                            Some(Err(e)) => break Some(e.to_string()),
                            None => break None,
                        }
                    }
                }
            };

            if let Some(err) = &end {
                tracing::warn!("log stream {} for {} failed: {}", stream, target.pod, err);
            }
            let _ = events.send(StreamEvent {
                stream,
                kind: StreamEventKind::Ended(end),
            });
        }));
    }

    /// Stop the running stream, if any
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // Create a fresh cancellation token for future streams
        self.cancel = CancellationToken::new();
    }
}

impl Default for LogStreamManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LogStreamManager {
    fn drop(&mut self) {
        self.stop();
    }
}
