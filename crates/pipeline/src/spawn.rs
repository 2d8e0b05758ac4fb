//! Background spawn with an exactly-once completion callback.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// How a guarded unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Finished,
    /// The future panicked; carries the panic message when it was a string.
    Panicked(String),
    /// The task was dropped before finishing (runtime shutdown or abort).
    Cancelled,
}

/// Runs `on_complete` exactly once: explicitly via [`Self::finish`], or
/// with [`Completion::Cancelled`] when dropped unfinished.
struct CompletionHook<F: FnOnce(Completion)> {
    callback: Option<F>,
}

impl<F: FnOnce(Completion)> CompletionHook<F> {
    fn finish(mut self, completion: Completion) {
        if let Some(callback) = self.callback.take() {
            callback(completion);
        }
    }
}

impl<F: FnOnce(Completion)> Drop for CompletionHook<F> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(Completion::Cancelled);
        }
    }
}

/// Spawn `work` on `tracker` and call `on_complete` once it ends, however
/// it ends. Panics inside `work` are caught and reported, not propagated.
pub fn spawn_guarded<Fut, F>(tracker: &TaskTracker, work: Fut, on_complete: F) -> JoinHandle<()>
where
    Fut: Future<Output = ()> + Send + 'static,
    F: FnOnce(Completion) + Send + 'static,
{
    // Built outside the future so a task dropped before its first poll
    // still reports `Cancelled`.
    let hook = CompletionHook {
        callback: Some(on_complete),
    };
    tracker.spawn(async move {
        let completion = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(()) => Completion::Finished,
            Err(payload) => Completion::Panicked(panic_message(payload.as_ref())),
        };
        hook.finish(completion);
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
