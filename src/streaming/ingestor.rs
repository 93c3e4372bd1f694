//! Per-provider ingest pipeline.
//!
//! A receive task reads the subscription and hands decoded events to a bounded
//! queue; the write loop drains the queue into the provider's store. Both halves
//! watch the shared cancellation token, so neither a blocked stream read nor a
//! full queue outlives the deadline.

use std::fmt;

use futures::{Stream, StreamExt};
use log::{debug, error, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use yellowstone_grpc_proto::geyser::SubscribeUpdate;

use crate::common::BenchError;
use crate::store::EventStoreWriter;
use crate::streaming::common::DEFAULT_CHANNEL_SIZE;
use crate::streaming::grpc::ObservedEvent;

/// How a pipeline finished
#[derive(Debug)]
pub enum IngestOutcome {
    /// The deadline fired; the designed end of a run
    Canceled { events: u64 },
    /// The provider closed the stream before the deadline
    StreamClosed { events: u64 },
    /// A stream or store error ended this pipeline early
    Failed { events: u64, error: BenchError },
}

impl IngestOutcome {
    pub fn events(&self) -> u64 {
        match self {
            Self::Canceled { events }
            | Self::StreamClosed { events }
            | Self::Failed { events, .. } => *events,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled { events } => write!(f, "completed at deadline, {events} events"),
            Self::StreamClosed { events } => write!(f, "stream closed early, {events} events"),
            Self::Failed { events, error } => write!(f, "failed after {events} events: {error}"),
        }
    }
}

/// Why the receive task stopped
#[derive(Debug)]
enum ReceiveEnd {
    Canceled,
    Closed,
    WriterGone,
    Failed(Status),
    Aborted(tokio::task::JoinError),
}

/// One provider's pipeline: owns its stream, queue and store
pub struct StreamIngestor<S> {
    label: String,
    stream: S,
    store: EventStoreWriter,
    channel_size: usize,
}

impl<S> StreamIngestor<S>
where
    S: Stream<Item = Result<SubscribeUpdate, Status>> + Send + Unpin + 'static,
{
    pub fn new(label: impl Into<String>, stream: S, store: EventStoreWriter) -> Self {
        Self { label: label.into(), stream, store, channel_size: DEFAULT_CHANNEL_SIZE }
    }

    pub fn with_channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size.max(1);
        self
    }

    /// Run until the deadline, a stream error, a write error or stream close.
    /// The store is flushed before returning in every case.
    pub async fn run(self, cancel: CancellationToken) -> IngestOutcome {
        let Self { label, stream, mut store, channel_size } = self;
        let (tx, mut rx) = mpsc::channel::<ObservedEvent>(channel_size);

        let receive_task =
            tokio::spawn(receive_loop(label.clone(), stream, tx, cancel.clone()));

        let mut write_error = None;
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = rx.recv() => event,
            };
            let Some(event) = event else { break };
            if let Err(e) = store.append(&event).await {
                error!("[{label}] Failed to write record: {e}");
                write_error = Some(e);
                break;
            }
        }

        // Whatever is already queued still lands in the store
        rx.close();
        if write_error.is_none() {
            while let Ok(event) = rx.try_recv() {
                if let Err(e) = store.append(&event).await {
                    error!("[{label}] Failed to write record: {e}");
                    write_error = Some(e);
                    break;
                }
            }
        }

        let receive_end = match receive_task.await {
            Ok(end) => end,
            Err(e) => {
                error!("[{label}] Receive task aborted: {e}");
                ReceiveEnd::Aborted(e)
            }
        };

        let events = store.records();
        let path = store.path().to_path_buf();
        if let Err(e) = store.finish().await {
            error!("[{label}] Failed to finalize {}: {e}", path.display());
            if write_error.is_none() {
                write_error = Some(e);
            }
        }

        let outcome = match (write_error, receive_end) {
            (Some(error), _) => IngestOutcome::Failed { events, error },
            (None, ReceiveEnd::Failed(status)) => {
                IngestOutcome::Failed { events, error: BenchError::from(status) }
            }
            (None, ReceiveEnd::Aborted(e)) => {
                IngestOutcome::Failed { events, error: BenchError::from(e) }
            }
            (None, ReceiveEnd::Closed) if !cancel.is_cancelled() => {
                IngestOutcome::StreamClosed { events }
            }
            (None, _) => IngestOutcome::Canceled { events },
        };
        debug!("[{label}] Ingest finished: {outcome}");
        outcome
    }
}

/// Read the subscription until cancellation, error or close, forwarding
/// accepted events. Neither the read nor the enqueue blocks past cancellation.
async fn receive_loop<S>(
    label: String,
    mut stream: S,
    tx: mpsc::Sender<ObservedEvent>,
    cancel: CancellationToken,
) -> ReceiveEnd
where
    S: Stream<Item = Result<SubscribeUpdate, Status>> + Unpin,
{
    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[{label}] Deadline reached, receive loop exiting");
                return ReceiveEnd::Canceled;
            }
            message = stream.next() => message,
        };

        match message {
            Some(Ok(update)) => {
                let Some(event) = ObservedEvent::from_update(update) else { continue };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return ReceiveEnd::Canceled,
                    sent = tx.send(event) => {
                        if sent.is_err() {
                            return ReceiveEnd::WriterGone;
                        }
                    }
                }
            }
            Some(Err(status)) => {
                // Transports may surface the deadline as a stream error
                if cancel.is_cancelled() {
                    return ReceiveEnd::Canceled;
                }
                error!("[{label}] Failed to receive message: {status}");
                return ReceiveEnd::Failed(status);
            }
            None => {
                if !cancel.is_cancelled() {
                    warn!("[{label}] Stream closed by provider");
                }
                return ReceiveEnd::Closed;
            }
        }
    }
}
