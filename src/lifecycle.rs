//! Teardown of spawned checkout work.
//!
//! Every flow a component starts is wrapped in a [`TaskGuard`]. Dropping the
//! guard aborts the flow at its next suspension point, which drops any
//! pending poll or navigation delay with it.

use std::future::Future;

use futures::future::{AbortHandle, Abortable, Aborted};
use tracing::debug;

/// Abort handle that fires on drop.
#[derive(Debug)]
pub struct TaskGuard {
    handle: AbortHandle,
}

impl TaskGuard {
    /// Wrap `future` without spawning it.
    pub fn new<F: Future>(future: F) -> (Self, Abortable<F>) {
        let (handle, registration) = AbortHandle::new_pair();
        (Self { handle }, Abortable::new(future, registration))
    }

    /// Spawn `future` on the browser event loop.
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + 'static,
    {
        let (guard, task) = Self::new(future);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(Aborted) = task.await {
                debug!(task = name, "task aborted on teardown");
            }
        });
        guard
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.handle.is_aborted()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_dropping_guard_aborts_task() {
        let (guard, task) = TaskGuard::new(async { 7 });
        drop(guard);
        assert_eq!(block_on(task), Err(Aborted));
    }

    #[test]
    fn test_live_guard_lets_task_finish() {
        let (guard, task) = TaskGuard::new(async { 7 });
        assert_eq!(block_on(task), Ok(7));
        assert!(!guard.is_aborted());
    }
}
