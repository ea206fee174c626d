//! Callable shapes a migration unit can expose for one direction.

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Ordered argument list handed to every operation of one run.
pub type Params = Vec<Value>;

/// Boxed future returned by future-style operations.
pub type OperationFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type SyncFn = dyn Fn(Params) -> anyhow::Result<()> + Send + Sync;
type FutureFn = dyn Fn(Params) -> OperationFuture + Send + Sync;
type CallbackFn = dyn Fn(Params, Completion) + Send + Sync;

/// One direction ("up" or "down") of a migration unit.
///
/// Units are written in whatever style suits them. The adapter looks at the
/// variant at invocation time and normalizes all of them into a single
/// awaited `anyhow::Result<()>`.
#[derive(Clone, Default)]
pub enum Operation {
    /// The unit does not define this direction. Completes immediately.
    #[default]
    Noop,
    /// Direct return. `Ok` is immediate success.
    Sync(Arc<SyncFn>),
    /// Returns a future that is awaited to completion.
    Future(Arc<FutureFn>),
    /// Receives a trailing [`Completion`] and signals the outcome through it.
    Callback(Arc<CallbackFn>),
}

impl Operation {
    pub fn noop() -> Self {
        Self::Noop
    }

    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Params) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Future(Arc::new(move |params| -> OperationFuture { Box::pin(f(params)) }))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Params, Completion) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Short name of the calling convention, used in log output.
    pub fn style(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Sync(_) => "sync",
            Self::Future(_) => "future",
            Self::Callback(_) => "callback",
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operation::{}", self.style())
    }
}

/// Completion handle passed as the last argument to callback-style operations.
///
/// Cloning is allowed; all clones share one slot. The first call wins and
/// every later call is ignored.
#[derive(Clone)]
pub struct Completion {
    slot: Arc<Mutex<Option<oneshot::Sender<anyhow::Result<()>>>>>,
}

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<anyhow::Result<()>>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (completion, rx)
    }

    /// Signal the outcome. `None` means success, `Some(err)` means failure.
    ///
    /// Returns `false` when the operation had already completed.
    pub fn call(&self, error: Option<anyhow::Error>) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(tx) => {
                let outcome = match error {
                    None => Ok(()),
                    Some(e) => Err(e),
                };
                // The receiver is gone when completion signals are not awaited.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn succeed(&self) -> bool {
        self.call(None)
    }

    pub fn fail(&self, error: impl Into<anyhow::Error>) -> bool {
        self.call(Some(error.into()))
    }

    /// Whether a completion has already been signalled through any clone.
    pub fn is_done(&self) -> bool {
        match self.slot.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_style() {
        assert_eq!(Operation::noop().style(), "noop");
        assert_eq!(Operation::sync(|_| Ok(())).style(), "sync");
        assert_eq!(Operation::future(|_| async { Ok(()) }).style(), "future");
        assert_eq!(Operation::callback(|_, done| { done.succeed(); }).style(), "callback");
        assert_eq!(Operation::default().style(), "noop");
    }

    #[tokio::test]
    async fn test_completion_first_call_wins() {
        let (completion, rx) = Completion::channel();
        let other = completion.clone();

        assert!(completion.succeed());
        assert!(!other.fail(anyhow::anyhow!("too late")));
        assert!(other.is_done());

        let outcome = rx.await.unwrap();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_completion_failure_is_delivered() {
        let (completion, rx) = Completion::channel();
        completion.fail(anyhow::anyhow!("boom"));

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_completion_dropped_closes_channel() {
        let (completion, rx) = Completion::channel();
        drop(completion);
        assert!(rx.await.is_err());
    }
}
