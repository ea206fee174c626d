//! Adapter layer normalizing migration calling conventions.
//!
//! A unit may return directly, return a future, or report through a
//! completion callback. [`invoke`] turns each of those into one awaited
//! result so the executor never cares which style a unit was written in.

mod types;

pub use types::{Completion, Operation, OperationFuture, Params};

use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("completion callback was dropped without being called")]
    CompletionDropped,
}

/// Invoke an operation with the given params and wait for it to finish.
///
/// Callback-style operations are only awaited when `promisify` is set.
/// Otherwise they are treated like a direct-return call: returning from the
/// function counts as success and completion signals are ignored.
///
/// No timeout is applied. An operation that never completes stalls the caller.
pub async fn invoke(operation: &Operation, params: Params, promisify: bool) -> anyhow::Result<()> {
    match operation {
        Operation::Noop => Ok(()),
        Operation::Sync(f) => f(params),
        Operation::Future(f) => f(params).await,
        Operation::Callback(f) => {
            let (completion, rx) = Completion::channel();

            if !promisify {
                warn!("Callback-style migration invoked without promisify, completion is not awaited");
                f(params, completion);
                return Ok(());
            }

            f(params, completion);

            match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(AdapterError::CompletionDropped.into()),
            }
        }
    }
}
