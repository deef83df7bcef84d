//! Concurrent batch dispatcher
//!
//! Fans N independent targets out to one task each and fans the results
//! back in, keyed by target. A failing target only affects its own entry.
//! The one exception is cancellation: the shared token (or a task reporting
//! [`Error::Cancelled`]) ends the whole batch with [`Error::Cancelled`].

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::ops::Deref;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Cancellation token that also fires once a timer elapses
///
/// Derefs to [`CancellationToken`], so `&deadline` can be passed anywhere a
/// token reference is accepted. Dropping the deadline stops its timer task;
/// clones of the inner token taken before that are never fired by it.
#[derive(Debug)]
pub struct Deadline {
    token: CancellationToken,
    timer: AbortHandle,
}

impl Deadline {
    /// The underlying token
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Deref for Deadline {
    type Target = CancellationToken;

    fn deref(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Deadline that fires after `after` elapses
///
/// Must be called from within a Tokio runtime.
pub fn deadline(after: Duration) -> Deadline {
    deadline_within(&CancellationToken::new(), after)
}

/// Child of `parent` that additionally fires after `after` elapses
///
/// The timer task ends at whichever comes first: the timer, cancellation of
/// the token (or `parent`), or the [`Deadline`] being dropped.
pub fn deadline_within(parent: &CancellationToken, after: Duration) -> Deadline {
    let token = parent.child_token();
    let trigger = token.clone();
    let timer = tokio::spawn(async move {
        tokio::select! {
            () = trigger.cancelled() => {}
            () = tokio::time::sleep(after) => {
                debug!(after_ms = after.as_millis(), "Deadline reached");
                trigger.cancel();
            }
        }
    })
    .abort_handle();
    Deadline { token, timer }
}

/// Outcome for a single target
#[derive(Debug)]
pub struct BatchEntry<K, T> {
    /// The target this entry belongs to
    pub target: K,
    /// Value or per-target error
    pub result: Result<T>,
}

/// Complete result set of a batch, in input order
#[derive(Debug)]
pub struct BatchResults<K, T> {
    entries: Vec<BatchEntry<K, T>>,
}

impl<K, T> BatchResults<K, T> {
    /// Number of entries (always the number of targets)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in input order
    pub fn iter(&self) -> impl Iterator<Item = &BatchEntry<K, T>> {
        self.entries.iter()
    }

    /// Successful entries
    pub fn successes(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().ok().map(|v| (&e.target, v)))
    }

    /// Failed entries
    pub fn failures(&self) -> impl Iterator<Item = (&K, &Error)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (&e.target, err)))
    }

    /// Count of failed entries
    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_err()).count()
    }

    /// Count of successful entries
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.len() - self.failed()
    }

    /// Entries in input order, by value
    #[must_use]
    pub fn into_entries(self) -> Vec<BatchEntry<K, T>> {
        self.entries
    }

    /// Keyed view; a duplicated target keeps its last entry
    #[must_use]
    pub fn into_map(self) -> HashMap<K, Result<T>>
    where
        K: Eq + Hash,
    {
        self.entries
            .into_iter()
            .map(|e| (e.target, e.result))
            .collect()
    }
}

impl<K, T> IntoIterator for BatchResults<K, T> {
    type Item = BatchEntry<K, T>;
    type IntoIter = std::vec::IntoIter<BatchEntry<K, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Runs one task per target with an optional concurrency cap
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchDispatcher {
    max_concurrency: Option<usize>,
}

impl BatchDispatcher {
    /// `None` runs every target at once; `Some(n)` caps running tasks at `n`
    ///
    /// A cap of zero is treated as one.
    #[must_use]
    pub fn new(max_concurrency: Option<usize>) -> Self {
        Self {
            max_concurrency: max_concurrency.map(|n| n.max(1)),
        }
    }

    /// Concurrency cap, if any
    #[must_use]
    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Run `task` for every target and collect all outcomes
    ///
    /// Each task receives its target and a child of `cancel`. Per-target
    /// errors, panics included, are recorded in that target's entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] as soon as `cancel` fires or any task
    /// reports cancellation. Tasks still running are detached; their results
    /// are discarded and queued tasks never start.
    pub async fn dispatch<K, T, F, Fut>(
        &self,
        targets: Vec<K>,
        cancel: &CancellationToken,
        task: F,
    ) -> Result<BatchResults<K, T>>
    where
        K: Clone + std::fmt::Debug + Send + 'static,
        T: Send + 'static,
        F: Fn(K, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Fires with `cancel`, and also when the batch ends early on its own.
        let batch = cancel.child_token();
        let semaphore = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut set = JoinSet::new();

        for (index, target) in targets.iter().enumerate() {
            let work = task(target.clone(), batch.clone());
            let semaphore = semaphore.clone();
            let token = batch.clone();

            set.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => tokio::select! {
                        biased;
                        () = token.cancelled() => return (index, Err(Error::Cancelled)),
                        permit = semaphore.acquire_owned() => match permit {
                            Ok(permit) => Some(permit),
                            Err(e) => return (index, Err(Error::Internal(e.to_string()))),
                        },
                    },
                    None => None,
                };

                if token.is_cancelled() {
                    return (index, Err(Error::Cancelled));
                }

                let outcome = AssertUnwindSafe(work)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(Error::Internal(panic_message(&*panic))));
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<T>>> = targets.iter().map(|_| None).collect();

        loop {
            tokio::select! {
                biased;
                () = batch.cancelled() => {
                    debug!(pending = set.len(), "Batch cancelled, detaching in-flight tasks");
                    set.detach_all();
                    return Err(Error::Cancelled);
                }
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok((_, Err(Error::Cancelled)))) => {
                        debug!(pending = set.len(), "Task observed cancellation, ending batch");
                        batch.cancel();
                        set.detach_all();
                        return Err(Error::Cancelled);
                    }
                    Some(Ok((index, outcome))) => {
                        if let Err(e) = &outcome {
                            warn!(item = ?targets[index], error = %e, "Batch target failed");
                        }
                        slots[index] = Some(outcome);
                    }
                    Some(Err(e)) => {
                        // Panics are caught inside the task, so this is an abort.
                        warn!(error = %e, "Batch task did not complete");
                    }
                }
            }
        }

        let entries: Vec<BatchEntry<K, T>> = targets
            .into_iter()
            .zip(slots)
            .map(|(target, slot)| BatchEntry {
                target,
                result: slot
                    .unwrap_or_else(|| Err(Error::Internal("task ended without a result".into()))),
            })
            .collect();

        let results = BatchResults { entries };
        info!(
            targets = results.len(),
            succeeded = results.succeeded(),
            failed = results.failed(),
            "Batch complete"
        );
        Ok(results)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn every_target_gets_exactly_one_entry() {
        let dispatcher = BatchDispatcher::default();
        let targets: Vec<u32> = (0..10).collect();

        let results = dispatcher
            .dispatch(targets, &CancellationToken::new(), |n, _| async move {
                if n % 3 == 0 {
                    Err(Error::Transport(format!("target {n} unreachable")))
                } else {
                    Ok(n * 10)
                }
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 10);
        assert_eq!(results.failed(), 4);
        assert_eq!(results.succeeded(), 6);

        let map = results.into_map();
        assert_eq!(map.len(), 10);
        assert!(map[&3].is_err());
        assert_eq!(*map[&4].as_ref().unwrap(), 40);
    }

    #[tokio::test]
    async fn entries_keep_input_order() {
        let dispatcher = BatchDispatcher::default();
        let targets = vec![50u64, 10, 30, 0];

        let results = dispatcher
            .dispatch(targets.clone(), &CancellationToken::new(), |ms, _| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(ms)
            })
            .await
            .unwrap();

        let order: Vec<u64> = results.iter().map(|e| e.target).collect();
        assert_eq!(order, targets);
        for entry in results {
            assert_eq!(entry.result.unwrap(), entry.target);
        }
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let started = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let counter = Arc::clone(&started);
        let err = BatchDispatcher::default()
            .dispatch(vec!["a", "b", "c"], &cancel, move |_, _| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_mid_batch_stops_queued_tasks() {
        let started = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&started);
        let err = BatchDispatcher::new(Some(1))
            .dispatch(vec![0, 1, 2, 3], &cancel, move |_, token| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    token.cancel();
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(())
                }
            })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_returns_without_waiting_for_stragglers() {
        let cancel = deadline(Duration::from_millis(50));
        let begun = Instant::now();

        let err = BatchDispatcher::default()
            .dispatch(vec![1, 2], &cancel, |_, _| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(begun.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn task_reporting_cancellation_ends_batch() {
        let err = BatchDispatcher::default()
            .dispatch(vec![1, 2, 3], &CancellationToken::new(), |n, _| async move {
                if n == 2 {
                    Err(Error::Cancelled)
                } else {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(n)
                }
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn concurrency_cap_is_respected() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let results = BatchDispatcher::new(Some(2))
            .dispatch((0..8).collect::<Vec<_>>(), &CancellationToken::new(), move |n, _| {
                let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(results.succeeded(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn panicking_target_is_isolated() {
        let results = BatchDispatcher::default()
            .dispatch(vec![1, 2, 3], &CancellationToken::new(), |n, _| async move {
                assert!(n != 2, "bad target");
                Ok(n)
            })
            .await
            .unwrap();

        let map = results.into_map();
        assert!(matches!(map[&2], Err(Error::Internal(_))));
        assert_eq!(*map[&1].as_ref().unwrap(), 1);
        assert_eq!(*map[&3].as_ref().unwrap(), 3);
    }

    #[tokio::test]
    async fn empty_batch() {
        let results = BatchDispatcher::default()
            .dispatch(Vec::<String>::new(), &CancellationToken::new(), |_, _| async {
                Ok(())
            })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_cap_is_treated_as_one() {
        let dispatcher = BatchDispatcher::new(Some(0));
        assert_eq!(dispatcher.max_concurrency(), Some(1));
    }

    #[tokio::test]
    async fn deadline_within_follows_parent() {
        let parent = CancellationToken::new();
        let child = deadline_within(&parent, Duration::from_secs(60));
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_deadline_stops_its_timer() {
        let dl = deadline(Duration::from_millis(20));
        let inner = dl.token().clone();
        drop(dl);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!inner.is_cancelled());
    }

    #[tokio::test]
    async fn deadline_fires() {
        let token = deadline(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }
}
