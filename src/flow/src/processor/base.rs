//! Processor trait and the plumbing every stage shares.
//!
//! Stages communicate through bounded tokio mpsc queues carrying [`Payload`]s
//! and observe a shared [`AbortSignal`]. Every delivery goes through [`emit`],
//! which races the send against the abort signal so a stage blocked on a full
//! queue still unwinds promptly.

use crate::abort::AbortSignal;
use crate::payload::Payload;
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub type PayloadSender = mpsc::Sender<Payload>;
pub type PayloadReceiver = mpsc::Receiver<Payload>;

/// Create a bounded queue between two stages.
pub fn payload_channel(capacity: usize) -> (PayloadSender, PayloadReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Trait for all pipeline stages.
///
/// A stage is driven by [`run_stage`](crate::processor::run_stage):
/// `process_data` is invoked once per upstream payload (or once with an empty
/// payload for a stage that originates data), then `finish` exactly once after
/// the input is exhausted. Nothing may be emitted after `finish` returns.
///
/// Fatal conditions are raised on `abort` rather than returned; once the
/// signal is set a stage must stop producing and return.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Get the processor identifier
    fn id(&self) -> &str;

    async fn process_data(&self, payload: Payload, output: &PayloadSender, abort: &AbortSignal);

    async fn finish(&self, output: &PayloadSender, abort: &AbortSignal);
}

/// Error type for processor operations
#[derive(thiserror::Error, Debug, Clone)]
pub enum ProcessorError {
    /// Downstream queue closed unexpectedly
    #[error("channel closed unexpectedly")]
    ChannelClosed,
    /// The pipeline was aborted before the operation could complete
    #[error("pipeline aborted")]
    Aborted,
    /// Non end-of-stream failure while reading a source
    #[error("{processor}: source read failed: {source}")]
    SourceRead {
        processor: String,
        source: Arc<io::Error>,
    },
    /// The source could not be wrapped in a decompressing reader
    #[error("{processor}: gzip setup failed: {source}")]
    Decompression {
        processor: String,
        source: Arc<io::Error>,
    },
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Processing error with message
    #[error("processing error: {0}")]
    ProcessingError(String),
}

impl ProcessorError {
    pub fn source_read(processor: impl Into<String>, err: io::Error) -> Self {
        ProcessorError::SourceRead {
            processor: processor.into(),
            source: Arc::new(err),
        }
    }

    pub fn decompression(processor: impl Into<String>, err: io::Error) -> Self {
        ProcessorError::Decompression {
            processor: processor.into(),
            source: Arc::new(err),
        }
    }
}

/// Deliver one payload downstream unless the pipeline has been aborted.
///
/// Waits for queue capacity, but gives up as soon as the abort signal fires.
pub async fn emit(
    output: &PayloadSender,
    abort: &AbortSignal,
    payload: Payload,
) -> Result<(), ProcessorError> {
    if abort.is_aborted() {
        return Err(ProcessorError::Aborted);
    }
    tokio::select! {
        biased;
        _ = abort.aborted() => Err(ProcessorError::Aborted),
        sent = output.send(payload) => sent.map_err(|_| ProcessorError::ChannelClosed),
    }
}
