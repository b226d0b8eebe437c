//! Execute asynchronous tasks with a configurable scheduler.
//!
//! This crate provides a collection of runtimes that can be
//! used to execute asynchronous tasks in a variety of ways. For production use,
//! the `tokio` module provides a runtime backed by [Tokio](https://tokio.rs).
//! For testing and simulation, the `deterministic` module provides a runtime
//! that allows for deterministic execution of tasks (given a fixed seed).
//!
//! # Terminology
//!
//! Each runtime is typically composed of a `Runner` and a `Context`. The `Runner` implements the
//! [Runner] trait and drives execution of a runtime. The `Context` implements any number of the
//! other traits to provide core functionality.

use prometheus_client::registry::Metric;
use shardbft_macros::select;
use std::{
    future::Future,
    time::{Duration, SystemTime},
};
use thiserror::Error;

pub mod deterministic;
pub mod tokio;
mod utils;
pub use utils::{Handle, Signal, Signaler};

/// Prefix for runtime metrics.
const METRICS_PREFIX: &str = "runtime";

/// Errors that can occur when interacting with the runtime.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("exited")]
    Exited,
    #[error("closed")]
    Closed,
    #[error("timeout")]
    Timeout,
}

/// Interface that any task scheduler must implement to start
/// running tasks.
pub trait Runner {
    /// Context defines the environment available to tasks.
    type Context;

    /// Start running a root task.
    ///
    /// When this function returns, all spawned tasks will be canceled.
    fn start<F, Fut>(self, f: F) -> Fut::Output
    where
        F: FnOnce(Self::Context) -> Fut,
        Fut: Future;
}

/// Interface that any task scheduler must implement to spawn tasks.
pub trait Spawner: Clone + Send + Sync + 'static {
    /// Spawn a task with the current context.
    ///
    /// Unlike directly awaiting a future, the task starts running immediately even if the caller
    /// never awaits the returned [Handle].
    fn spawn<F, Fut, T>(self, f: F) -> Handle<T>
    where
        F: FnOnce(Self) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static;

    /// Signals the runtime to stop execution and that all outstanding tasks
    /// should perform any required cleanup and exit.
    ///
    /// This method does not actually kill any tasks but rather signals to them, using
    /// the [Signal] returned by [Spawner::stopped], that they should exit.
    fn stop(&self, value: i32);

    /// Returns an instance of a [Signal] that resolves when [Spawner::stop] is called by
    /// any task.
    ///
    /// If [Spawner::stop] has already been called, the returned [Signal] will resolve
    /// immediately.
    fn stopped(&self) -> Signal;
}

/// Interface to register and encode metrics.
pub trait Metrics: Clone + Send + Sync + 'static {
    /// Get the current label of the context.
    fn label(&self) -> String;

    /// Create a new instance of `Metrics` with the given label appended to the end
    /// of the current `Metrics` label.
    ///
    /// This is commonly used to create a nested context for `register`.
    ///
    /// It is not permitted for any implementation to use `METRICS_PREFIX` as the start of a
    /// label (reserved for metrics for the runtime).
    fn with_label(&self, label: &str) -> Self;

    /// Register a metric with the runtime.
    ///
    /// Any registered metric will include (as a prefix) the label of the current context.
    fn register<N: Into<String>, H: Into<String>>(&self, name: N, help: H, metric: impl Metric);

    /// Encode all metrics into a buffer.
    fn encode(&self) -> String;
}

/// Interface that any task scheduler must implement to provide
/// time-based operations.
///
/// It is necessary to mock time to provide deterministic execution
/// of arbitrary tasks.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Returns the current time.
    fn current(&self) -> SystemTime;

    /// Sleep for the given duration.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send + 'static;

    /// Sleep until the given deadline.
    fn sleep_until(&self, deadline: SystemTime) -> impl Future<Output = ()> + Send + 'static;

    /// Await a future with a timeout, returning [Error::Timeout] if it expires.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use shardbft_runtime::{deterministic, Error, Runner, Clock};
    ///
    /// let executor = deterministic::Runner::default();
    /// executor.start(|context| async move {
    ///     match context
    ///         .timeout(Duration::from_millis(100), async { 42 })
    ///         .await
    ///     {
    ///         Ok(value) => assert_eq!(value, 42),
    ///         Err(Error::Timeout) => panic!("should not timeout"),
    ///         Err(e) => panic!("unexpected error: {:?}", e),
    ///     }
    /// });
    /// ```
    fn timeout<F, T>(
        &self,
        duration: Duration,
        future: F,
    ) -> impl Future<Output = Result<T, Error>> + Send + '_
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        async move {
            select! {
                result = future => {
                    Ok(result)
                },
                _ = self.sleep(duration) => {
                    Err(Error::Timeout)
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{channel::mpsc, SinkExt, StreamExt};
    use shardbft_macros::test_traced;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn test_error_future<R: Runner>(runner: R) {
        async fn error_future() -> Result<&'static str, &'static str> {
            Err("An error occurred")
        }
        let result = runner.start(|_| error_future());
        assert_eq!(result, Err("An error occurred"));
    }

    fn test_clock_sleep<R: Runner>(runner: R)
    where
        R::Context: Spawner + Clock,
    {
        runner.start(|context| async move {
            // Capture initial time
            let start = context.current();
            let sleep_duration = Duration::from_millis(10);
            context.sleep(sleep_duration).await;

            // After run, time should have advanced
            let end = context.current();
            assert!(end.duration_since(start).unwrap() >= sleep_duration);
        });
    }

    fn test_clock_timeout<R: Runner>(runner: R)
    where
        R::Context: Spawner + Clock,
    {
        runner.start(|context| async move {
            // Future completes before timeout
            let result = context
                .timeout(Duration::from_millis(100), async { "done" })
                .await;
            assert_eq!(result, Ok("done"));

            // Future never completes
            let result = context
                .timeout(Duration::from_millis(50), futures::future::pending::<()>())
                .await;
            assert_eq!(result, Err(Error::Timeout));
        });
    }

    fn test_spawn_and_await<R: Runner>(runner: R)
    where
        R::Context: Spawner + Clock + Metrics,
    {
        runner.start(|context| async move {
            let counter = Arc::new(AtomicUsize::new(0));
            let mut handles = Vec::new();
            for i in 0..10 {
                let counter = counter.clone();
                handles.push(context.with_label(&format!("worker_{i}")).spawn(
                    move |context| async move {
                        context.sleep(Duration::from_millis(i as u64)).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                        i
                    },
                ));
            }
            let mut total = 0;
            for handle in handles {
                total += handle.await.unwrap();
            }
            assert_eq!(total, 45);
            assert_eq!(counter.load(Ordering::SeqCst), 10);
        });
    }

    fn test_spawn_abort<R: Runner>(runner: R)
    where
        R::Context: Spawner + Clock,
    {
        runner.start(|context| async move {
            let handle = context.clone().spawn(|_| async move {
                futures::future::pending::<()>().await;
            });
            handle.abort();
            assert_eq!(handle.await, Err(Error::Closed));
        });
    }

    fn test_channel_select<R: Runner>(runner: R)
    where
        R::Context: Spawner + Clock,
    {
        runner.start(|context| async move {
            let (mut sender, mut receiver) = mpsc::channel(8);
            context.clone().spawn(|context| async move {
                for i in 0..3u32 {
                    context.sleep(Duration::from_millis(5)).await;
                    sender.send(i).await.unwrap();
                }
            });

            let mut received = Vec::new();
            loop {
                select! {
                    msg = receiver.next() => {
                        match msg {
                            Some(msg) => received.push(msg),
                            None => break,
                        }
                    },
                    _ = context.sleep(Duration::from_secs(1)) => {
                        panic!("timed out waiting for messages");
                    },
                }
            }
            assert_eq!(received, vec![0, 1, 2]);
        });
    }

    fn test_shutdown<R: Runner>(runner: R)
    where
        R::Context: Spawner + Clock,
    {
        let kill = 9;
        runner.start(|context| async move {
            let (mut sender, mut receiver) = mpsc::channel(1);
            context.clone().spawn(move |context| async move {
                let mut signal = context.stopped();
                loop {
                    select! {
                        sig = &mut signal => {
                            assert_eq!(sig.unwrap(), kill);
                            sender.send(()).await.unwrap();
                            return;
                        },
                        _ = context.sleep(Duration::from_millis(10)) => {},
                    }
                }
            });
            context.sleep(Duration::from_millis(50)).await;
            context.stop(kill);
            receiver.next().await.unwrap();

            // Signal resolves immediately once stopped
            assert_eq!(context.stopped().await.unwrap(), kill);
        });
    }

    fn test_metrics<R: Runner>(runner: R)
    where
        R::Context: Metrics,
    {
        runner.start(|context| async move {
            let counter: prometheus_client::metrics::counter::Counter =
                prometheus_client::metrics::counter::Counter::default();
            let context = context.with_label("actor");
            assert_eq!(context.label(), "actor");
            context.register("events", "number of events", counter.clone());
            counter.inc();
            let encoded = context.encode();
            assert!(encoded.contains("actor_events_total 1"));
        });
    }

    #[test_traced]
    fn test_deterministic() {
        test_error_future(deterministic::Runner::default());
        test_clock_sleep(deterministic::Runner::default());
        test_clock_timeout(deterministic::Runner::default());
        test_spawn_and_await(deterministic::Runner::default());
        test_spawn_abort(deterministic::Runner::default());
        test_channel_select(deterministic::Runner::default());
        test_shutdown(deterministic::Runner::default());
        test_metrics(deterministic::Runner::default());
    }

    #[test_traced]
    fn test_tokio() {
        test_error_future(tokio::Runner::default());
        test_clock_sleep(tokio::Runner::default());
        test_clock_timeout(tokio::Runner::default());
        test_spawn_and_await(tokio::Runner::default());
        test_spawn_abort(tokio::Runner::default());
        test_channel_select(tokio::Runner::default());
        test_shutdown(tokio::Runner::default());
        test_metrics(tokio::Runner::default());
    }
}
