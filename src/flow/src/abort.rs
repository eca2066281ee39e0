//! Pipeline-wide abort signal.
//!
//! Any stage may raise the signal with the error that made it give up. The
//! first error wins and becomes the pipeline's outcome; later raises are
//! accepted and ignored. Raising never blocks, whether or not anyone is
//! currently listening, and every clone of the signal observes it.

use crate::processor::ProcessorError;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

struct AbortInner {
    reason: OnceLock<ProcessorError>,
    raised: watch::Sender<bool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        let (raised, _) = watch::channel(false);
        Self {
            inner: Arc::new(AbortInner {
                reason: OnceLock::new(),
                raised,
            }),
        }
    }

    /// Raise the signal. Returns `true` if `err` is the first, authoritative reason.
    pub fn abort(&self, err: ProcessorError) -> bool {
        let first = self.inner.reason.set(err).is_ok();
        // The reason is stored before the flag flips so observers always find it.
        self.inner.raised.send_replace(true);
        first
    }

    /// Raise the signal on `Err`, pass the value through on `Ok`.
    pub fn abort_if_err<T, E>(&self, result: Result<T, E>) -> Option<T>
    where
        E: Into<ProcessorError>,
    {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.abort(err.into());
                None
            }
        }
    }

    pub fn is_aborted(&self) -> bool {
        *self.inner.raised.borrow()
    }

    /// Resolves once the signal has been raised, immediately if it already was.
    ///
    /// Cancellation safe; meant to be one arm of a `tokio::select!`.
    pub async fn aborted(&self) {
        let mut raised = self.inner.raised.subscribe();
        loop {
            if *raised.borrow_and_update() {
                return;
            }
            if raised.changed().await.is_err() {
                // The sender lives as long as `self`, so this is unreachable in practice.
                return;
            }
        }
    }

    /// The first error raised, if any.
    pub fn reason(&self) -> Option<ProcessorError> {
        self.inner.reason.get().cloned()
    }

    /// Terminal status of the pipeline: the first error raised, or `Ok`.
    pub fn outcome(&self) -> Result<(), ProcessorError> {
        match self.reason() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("reason", &self.inner.reason.get())
            .finish()
    }
}
