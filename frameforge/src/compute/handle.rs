//! Completion handle for submitted tasks.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::error::ComputeError;
use super::task::{ComputeResult, TaskId};

/// Resolves to the task's result or its terminal error.
///
/// Exactly one value is delivered per task. Dropping the handle does not
/// cancel the task; its result is discarded when it completes.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    rx: oneshot::Receiver<Result<ComputeResult, ComputeError>>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, rx: oneshot::Receiver<Result<ComputeResult, ComputeError>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl Future for TaskHandle {
    type Output = Result<ComputeResult, ComputeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the runtime went away mid-task
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ComputeError::ShuttingDown)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_sender_resolves_to_shutting_down() {
        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle::new(TaskId::from_raw(1), rx);
        drop(tx);
        assert_eq!(handle.await.unwrap_err(), ComputeError::ShuttingDown);
    }
}
