//! Counted fan-out/fan-in over spawned tasks
//!
//! Every spawned task reports exactly once on a shared channel. `finish`
//! drops the collector's own sender and then receives exactly as many results
//! as tasks were spawned, so termination never depends on who closes the
//! channel.

use hotelres_core::{AppError, AppResult};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::error;

pub struct FanIn<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: mpsc::UnboundedReceiver<T>,
    spawned: usize,
}

impl<T: Send + 'static> FanIn<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, spawned: 0 }
    }

    /// Run `task` on the runtime and count it
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.spawned += 1;
        tokio::spawn(async move {
            // The collector only goes away if the request was abandoned.
            let _ = tx.send(task.await);
        });
    }

    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Wait for every spawned task to report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if a task ended without reporting,
    /// e.g. because it panicked.
    pub async fn finish(self) -> AppResult<Vec<T>> {
        let Self {
            tx,
            mut rx,
            spawned,
        } = self;
        drop(tx);

        let mut results = Vec::with_capacity(spawned);
        while results.len() < spawned {
            match rx.recv().await {
                Some(result) => results.push(result),
                None => {
                    error!(
                        spawned,
                        received = results.len(),
                        "Fan-in task ended without reporting"
                    );
                    return Err(AppError::Internal(format!(
                        "{} of {} tasks did not report",
                        spawned - results.len(),
                        spawned
                    )));
                }
            }
        }
        Ok(results)
    }
}

impl<T: Send + 'static> Default for FanIn<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_collects_every_result() {
        let mut fanin = FanIn::new();
        for i in 0..20u64 {
            fanin.spawn(async move {
                tokio::time::sleep(Duration::from_millis(20 - i)).await;
                i
            });
        }
        assert_eq!(fanin.spawned(), 20);

        let mut results = fanin.finish().await.unwrap();
        results.sort_unstable();
        assert_eq!(results, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_fan_in_finishes() {
        let fanin: FanIn<bool> = FanIn::new();
        assert!(fanin.finish().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panicked_task_is_reported() {
        let mut fanin = FanIn::new();
        fanin.spawn(async { 1 });
        fanin.spawn(async {
            if true {
                panic!("segment task failed");
            }
            2
        });

        let err = fanin.finish().await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
