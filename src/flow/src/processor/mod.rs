//! Pipeline stages
//!
//! - `Processor` is the contract every stage implements
//! - `run_stage` drives one processor as its own tokio task
//! - `IoReader` originates payloads from a byte source
//! - Stages communicate via `Payload`s through bounded tokio mpsc channels

pub mod base;
pub mod io_reader;
pub mod stage;

pub use base::{
    emit, payload_channel, PayloadReceiver, PayloadSender, Processor, ProcessorError,
    DEFAULT_CHANNEL_CAPACITY,
};
pub use io_reader::{IoReader, IoReaderBuilder, IoReaderConfig};
pub use stage::{run_stage, spawn_stage, StageExit};
