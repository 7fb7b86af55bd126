//! Background task that reacts to external state changes.
//!
//! The watcher owns nothing but the loop: it waits on a [`ChangeSource`] and
//! runs a callback for every signal. The callback decides whether the log
//! actually drifted. Callbacks run one at a time; signals that arrive while
//! one is running collapse into the next wake-up.

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::ChangeSource;

/// A running change watcher. Dropping it stops the task.
pub struct SyncWatcher {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl SyncWatcher {
    /// Spawn the watch loop on the current tokio runtime.
    pub fn spawn<F>(source: ChangeSource, on_signal: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(source, on_signal, shutdown_rx));
        Self {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Stop the loop and wait for it to finish.
    ///
    /// A callback that is already running completes first.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let handle = &mut self.handle;
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                tracing::warn!("Sync watcher ended abnormally: {}", e);
            }
        }
    }

    /// True once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SyncWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn run<F>(source: ChangeSource, on_signal: F, mut shutdown: oneshot::Receiver<()>)
where
    F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
{
    match source {
        ChangeSource::Notify(mut rx) => {
            tracing::info!("Sync watcher started (change events)");
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            tracing::debug!("Navigation log closed its change channel");
                            break;
                        }
                        on_signal().await;
                    }
                }
            }
        }
        ChangeSource::Poll(period) => {
            tracing::info!("Sync watcher started (polling every {:?})", period);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = ticker.tick() => on_signal().await,
                }
            }
        }
        ChangeSource::Disabled => {
            tracing::debug!("Sync watcher has nothing to watch");
            return;
        }
    }
    tracing::info!("Sync watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{MemoryNavigationLog, NavigationLog};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> BoxFuture<'static, ()> + Send + Sync) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        let callback = move || {
            let hits = hits.clone();
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }) as BoxFuture<'static, ()>
        };
        (count, callback)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval() {
        let (count, callback) = counter();
        let watcher = SyncWatcher::spawn(ChangeSource::Poll(Duration::from_millis(250)), callback);

        // Nothing fires before the first period elapses
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Ticks at 250ms and 500ms
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        watcher.stop().await;
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wakes_on_notifications() {
        let log = MemoryNavigationLog::new("http://h/");
        let (count, callback) = counter();
        let watcher = SyncWatcher::spawn(ChangeSource::Notify(log.subscribe().unwrap()), callback);

        log.navigate("http://h/#q=a");
        for _ in 0..100 {
            if count.load(Ordering::SeqCst) >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_disabled_source_exits() {
        let (count, callback) = counter();
        let watcher = SyncWatcher::spawn(ChangeSource::Disabled, callback);
        for _ in 0..100 {
            if watcher.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(watcher.is_finished());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
