//! Building blocks for concurrent data pipelines: the payload envelope, the
//! pipeline-wide abort signal and the stage contract with its driver.

pub mod abort;
pub mod payload;
pub mod processor;

pub use abort::AbortSignal;
pub use payload::{DecodeError, DecodeReason, Json, JsonPayload, Payload, PayloadTarget, StructuredPayload};
pub use processor::{
    emit, payload_channel, run_stage, spawn_stage, IoReader, IoReaderBuilder, IoReaderConfig,
    PayloadReceiver, PayloadSender, Processor, ProcessorError, StageExit,
    DEFAULT_CHANNEL_CAPACITY,
};
