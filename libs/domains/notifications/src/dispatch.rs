//! Attempt-and-record: run sends for a batch of items so that one failure
//! never stops its siblings.
//!
//! Both the reminder poller and the invitation fan-out go through here. A
//! failure is logged with its item label and recorded in the report; nothing
//! is propagated.

use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// One failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub item: String,
    pub error: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record one finished attempt, returning the value on success.
    pub fn record<T, E: Display>(&mut self, item: &str, result: Result<T, E>) -> Option<T> {
        self.attempted += 1;
        match result {
            Ok(value) => {
                self.succeeded += 1;
                Some(value)
            }
            Err(e) => {
                warn!(item = %item, error = %e, "Dispatch attempt failed");
                self.failures.push(DispatchFailure {
                    item: item.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: DispatchReport) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
    }
}

/// Await one attempt and record it.
pub async fn attempt<F, T, E>(report: &mut DispatchReport, item: &str, future: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let result = future.await;
    report.record(item, result)
}

/// Attempt `op` for every item, at most `concurrency` at a time.
///
/// Returns once every attempt has finished. With `concurrency` 1 the items run
/// one after another in iteration order.
pub async fn attempt_all<I, F, Fut, T, E>(items: I, concurrency: usize, op: F) -> DispatchReport
where
    I: IntoIterator,
    I::Item: Display,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    stream::iter(items)
        .map(|item| {
            let label = item.to_string();
            let future = op(item);
            async move { (label, future.await) }
        })
        .buffer_unordered(concurrency.max(1))
        .fold(DispatchReport::new(), |mut report, (label, result)| async move {
            report.record(&label, result);
            report
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_attempt_records_success_and_failure() {
        let mut report = DispatchReport::new();

        let ok = attempt(&mut report, "a", async { Ok::<_, String>(1) }).await;
        let failed = attempt(&mut report, "b", async { Err::<i32, _>("smtp down") }).await;

        assert_eq!(ok, Some(1));
        assert_eq!(failed, None);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(
            report.failures,
            vec![DispatchFailure {
                item: "b".to_string(),
                error: "smtp down".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_failure_in_middle_does_not_stop_the_rest() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        let report = attempt_all(["first", "second", "third"], 1, |item| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(item);
                if item == "second" {
                    Err("refused".to_string())
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures[0].item, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_attempts_all_complete_before_return() {
        let done = Arc::new(Mutex::new(0usize));

        let report = attempt_all(1..=5, 3, |n| {
            let done = done.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100 * (6 - n) as u64)).await;
                *done.lock().unwrap() += 1;
                Ok::<_, String>(())
            }
        })
        .await;

        assert_eq!(*done.lock().unwrap(), 5);
        assert_eq!(report.attempted, 5);
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = attempt_all(Vec::<String>::new(), 4, |_| async { Ok::<_, String>(()) }).await;
        assert_eq!(report, DispatchReport::default());
    }

    #[test]
    fn test_merge() {
        let mut total = DispatchReport::new();
        let mut part = DispatchReport::new();
        part.record("x", Err::<(), _>("boom"));
        part.record("y", Ok::<_, String>(()));

        total.merge(part);
        assert_eq!(total.attempted, 2);
        assert_eq!(total.failed(), 1);
    }
}
