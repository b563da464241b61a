//! Bounded FIFO worker pool that serializes state-changing handlers (spec.md §4.5).
//!
//! Grounded on the original's `GThreadPool` + `soup_server_pause_message`/
//! `unpause_message` pair: a single dedicated worker drains a fixed-capacity queue in
//! order; enqueue is non-blocking and fails over capacity rather than blocking the I/O
//! thread. Here "pause the response" becomes a `oneshot::Receiver<Response>` the HTTP
//! handler awaits — the response is only written once the worker resolves it, which is
//! the promise/future re-expression spec.md §9 calls for when the HTTP stack has no
//! native pause primitive.

use std::future::Future;
use std::pin::Pin;

use axum::response::Response;
use dial_core::CoreError;
use tokio::sync::{mpsc, oneshot};

type Task = Pin<Box<dyn Future<Output = Response> + Send>>;

struct Job {
    task: Task,
    respond_to: oneshot::Sender<Response>,
}

/// Handle to the pool; clone freely, all clones share the same queue and worker.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
}

impl WorkerPool {
    /// Spawns the single dedicated worker and returns a handle bound to a queue of
    /// `capacity` pending jobs (default 5, spec.md §4.5).
    pub fn new(capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Job>(capacity);

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let response = job.task.await;
                let _ = job.respond_to.send(response);
            }
        });

        Self { sender }
    }

    /// Enqueues `task`, non-blocking. Returns `CoreError::QueueSaturated` immediately
    /// if the pending queue is already at capacity — the caller maps this to 403
    /// (spec.md §4.5, §7) without ever blocking the HTTP I/O path.
    pub fn enqueue<F>(&self, task: F) -> Result<oneshot::Receiver<Response>, CoreError>
    where
        F: Future<Output = Response> + Send + 'static,
    {
        let (respond_to, rx) = oneshot::channel();
        let job = Job {
            task: Box::pin(task),
            respond_to,
        };
        self.sender
            .try_send(job)
            .map_err(|_| CoreError::QueueSaturated)?;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn runs_enqueued_task_and_resolves_response() {
        let pool = WorkerPool::new(5);
        let rx = pool
            .enqueue(async { StatusCode::OK.into_response() })
            .unwrap();
        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn processes_jobs_in_fifo_order() {
        let pool = WorkerPool::new(5);
        let (order_tx, mut order_rx) = mpsc::unbounded_channel();
        let mut receivers = Vec::new();
        for i in 0..3u32 {
            let order_tx = order_tx.clone();
            let rx = pool
                .enqueue(async move {
                    let _ = order_tx.send(i);
                    StatusCode::OK.into_response()
                })
                .unwrap();
            receivers.push(rx);
        }
        for rx in receivers {
            rx.await.unwrap();
        }
        drop(order_tx);
        let mut observed = Vec::new();
        while let Some(i) = order_rx.recv().await {
            observed.push(i);
        }
        assert_eq!(observed, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn rejects_when_queue_saturated() {
        let pool = WorkerPool::new(1);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release_rx = std::sync::Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
        let blocker_release = release_rx.clone();
        let _blocker = pool
            .enqueue(async move {
                let rx = blocker_release.lock().await.take().unwrap();
                let _ = rx.await;
                StatusCode::OK.into_response()
            })
            .unwrap();

        // Give the worker a chance to pick up the blocking job before we fill the queue.
        tokio::task::yield_now().await;

        let mut saturated = false;
        for _ in 0..4 {
            if pool
                .enqueue(async { StatusCode::OK.into_response() })
                .is_err()
            {
                saturated = true;
                break;
            }
        }
        assert!(saturated, "expected the bounded queue to saturate");
        let _ = release_tx.send(());
    }
}
