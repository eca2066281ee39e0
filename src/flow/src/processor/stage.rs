//! Stage driver - runs one processor as an independent task.
//!
//! The driver owns the stage's queues. It feeds every upstream payload to
//! `process_data` in arrival order, calls `finish` once when the input is
//! exhausted and then drops its output sender, which is how downstream learns
//! the stage completed. Every wait races the abort signal; an aborted stage
//! returns without calling `finish`.

use crate::abort::AbortSignal;
use crate::payload::Payload;
use crate::processor::{PayloadReceiver, PayloadSender, Processor};
use logger::Logger;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How a stage stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// Input exhausted and `finish` ran.
    Completed,
    /// The abort signal was observed.
    Aborted,
}

/// Spawn [`run_stage`] onto the current tokio runtime.
pub fn spawn_stage(
    processor: Arc<dyn Processor>,
    input: Option<PayloadReceiver>,
    output: PayloadSender,
    abort: AbortSignal,
    logger: Logger,
) -> JoinHandle<StageExit> {
    tokio::spawn(run_stage(processor, input, output, abort, logger))
}

/// Drive `processor` to completion or abort.
///
/// `input = None` marks a stage that originates data: it is invoked once with
/// [`Payload::empty`].
pub async fn run_stage(
    processor: Arc<dyn Processor>,
    input: Option<PayloadReceiver>,
    output: PayloadSender,
    abort: AbortSignal,
    logger: Logger,
) -> StageExit {
    let processor_id = processor.id().to_string();
    logger.status(format_args!("{}: stage starting", processor_id));

    let exit = drive(processor.as_ref(), input, &output, &abort).await;
    match exit {
        StageExit::Completed => {
            logger.status(format_args!("{}: stage completed", processor_id));
        }
        StageExit::Aborted => {
            let reason = abort
                .reason()
                .map(|err| err.to_string())
                .unwrap_or_default();
            logger.info(format_args!("{}: stage aborted: {}", processor_id, reason));
        }
    }
    exit
}

async fn drive(
    processor: &dyn Processor,
    input: Option<PayloadReceiver>,
    output: &PayloadSender,
    abort: &AbortSignal,
) -> StageExit {
    match input {
        None => {
            if !process_one(processor, Payload::empty(), output, abort).await {
                return StageExit::Aborted;
            }
        }
        Some(mut input) => loop {
            let next = tokio::select! {
                biased;
                _ = abort.aborted() => return StageExit::Aborted,
                next = input.recv() => next,
            };
            match next {
                Some(payload) => {
                    if !process_one(processor, payload, output, abort).await {
                        return StageExit::Aborted;
                    }
                }
                None => break,
            }
        },
    }

    tokio::select! {
        biased;
        _ = abort.aborted() => return StageExit::Aborted,
        _ = processor.finish(output, abort) => {}
    }
    if abort.is_aborted() {
        StageExit::Aborted
    } else {
        StageExit::Completed
    }
}

/// Returns `false` once the pipeline is aborted.
async fn process_one(
    processor: &dyn Processor,
    payload: Payload,
    output: &PayloadSender,
    abort: &AbortSignal,
) -> bool {
    tokio::select! {
        biased;
        _ = abort.aborted() => false,
        _ = processor.process_data(payload, output, abort) => !abort.is_aborted(),
    }
}
