//! Batched dispatch of decision requests to the inference backend.
//!
//! [`BatchScheduler`] buffers `(handle, vector)` requests and hands them
//! to the backend as one batch when a flush is forced, when the queue
//! reaches `max_batch_size`, or when `batch_timeout` has passed since
//! the last flush. A batch resolves atomically: either every request
//! gets a [`Decision`], or the whole batch is dropped and counted.
//!
//! There is no timeout on the backend call itself. A slow call shows up
//! as cycle latency, which the admission controller turns into a lower
//! ceiling.

use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use std::vec::Drain;

use log::warn;
use warden_core::{AgentHandle, BackendError, Decision, InferenceBackend};
use warden_obs::EncodedVector;

use crate::config::{BatchConfig, ConfigError};
use crate::metrics::BatchingStats;

/// A dispatched batch failed; its requests were dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlushError {
    /// Requests dropped with the batch.
    pub dropped: usize,
    /// Why the backend failed.
    pub source: BackendError,
}

impl fmt::Display for FlushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch of {} dropped: {}", self.dropped, self.source)
    }
}

impl Error for FlushError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// One pending request.
#[derive(Clone, Debug)]
struct DecisionRequest {
    handle: AgentHandle,
    vector: EncodedVector,
    enqueued_at: Instant,
}

/// Buffers decision requests and dispatches them in batches.
pub struct BatchScheduler {
    config: BatchConfig,
    backend: Box<dyn InferenceBackend>,
    pending: Vec<DecisionRequest>,
    decisions: Vec<Decision>,
    last_flush: Instant,
    total_batches: u64,
    total_requests: u64,
    dispatch_time: Duration,
    failed_batches: u64,
    dropped_requests: u64,
    max_queue_wait: Duration,
}

impl BatchScheduler {
    /// Create a scheduler whose timeout clock starts at `now`.
    pub fn new(
        config: BatchConfig,
        backend: Box<dyn InferenceBackend>,
        now: Instant,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            pending: Vec::with_capacity(config.max_batch_size),
            decisions: Vec::with_capacity(config.max_batch_size),
            config,
            backend,
            last_flush: now,
            total_batches: 0,
            total_requests: 0,
            dispatch_time: Duration::ZERO,
            failed_batches: 0,
            dropped_requests: 0,
            max_queue_wait: Duration::ZERO,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Name of the backend, for logs.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Queue a request stamped with the current time.
    pub fn enqueue(&mut self, handle: AgentHandle, vector: EncodedVector) {
        self.enqueue_at(handle, vector, Instant::now());
    }

    /// Queue a request stamped with `now`.
    pub fn enqueue_at(&mut self, handle: AgentHandle, vector: EncodedVector, now: Instant) {
        self.pending.push(DecisionRequest {
            handle,
            vector,
            enqueued_at: now,
        });
    }

    /// Whether a non-forced flush at `now` would dispatch.
    pub fn should_flush(&self, now: Instant) -> bool {
        !self.pending.is_empty()
            && (self.pending.len() >= self.config.max_batch_size
                || now.saturating_duration_since(self.last_flush) >= self.config.batch_timeout)
    }

    /// [`flush_at`](Self::flush_at) with the current time.
    pub fn flush(&mut self, force: bool) -> Result<usize, FlushError> {
        self.flush_at(Instant::now(), force)
    }

    /// Dispatch every pending request if forced or a trigger has fired.
    ///
    /// Returns the number of requests resolved. Flushing an empty queue
    /// never calls the backend; it only restarts the timeout clock.
    /// On backend failure the queue is still cleared and the dropped
    /// count is returned in the error.
    pub fn flush_at(&mut self, now: Instant, force: bool) -> Result<usize, FlushError> {
        if self.pending.is_empty() {
            self.last_flush = now;
            return Ok(0);
        }
        if !force && !self.should_flush(now) {
            return Ok(0);
        }

        // The batch leaves the queue before dispatch; if the backend
        // panics, the queue stays empty. The buffer is handed back after.
        let mut batch = std::mem::take(&mut self.pending);
        let n = batch.len();
        let oldest = batch
            .iter()
            .map(|r| r.enqueued_at)
            .min()
            .unwrap_or(now);
        self.max_queue_wait = self
            .max_queue_wait
            .max(now.saturating_duration_since(oldest));

        let inputs: Vec<&[f32]> = batch.iter().map(|r| r.vector.as_slice()).collect();
        let started = Instant::now();
        let result = self.backend.run_batch(&inputs);
        let elapsed = started.elapsed();
        drop(inputs);
        self.last_flush = now;

        let result = result.and_then(|actions| {
            if actions.len() == n {
                Ok(actions)
            } else {
                Err(BackendError::ShapeMismatch {
                    expected: n,
                    actual: actions.len(),
                })
            }
        });

        match result {
            Ok(actions) => {
                self.decisions.extend(
                    batch
                        .drain(..)
                        .zip(actions)
                        .map(|(req, action)| Decision {
                            handle: req.handle,
                            action,
                        }),
                );
                self.pending = batch;
                self.total_batches += 1;
                self.total_requests += n as u64;
                self.dispatch_time += elapsed;
                Ok(n)
            }
            Err(source) => {
                batch.clear();
                self.pending = batch;
                self.failed_batches += 1;
                self.dropped_requests += n as u64;
                warn!(
                    "backend '{}' failed a batch of {n}: {source}",
                    self.backend.name()
                );
                Err(FlushError { dropped: n, source })
            }
        }
    }

    /// Drop every pending request without dispatching.
    ///
    /// Returns how many were dropped. Resolved decisions are kept.
    pub fn clear_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Drop pending requests from `handle` (e.g. after it despawned).
    pub fn discard(&mut self, handle: AgentHandle) -> usize {
        let before = self.pending.len();
        self.pending.retain(|r| r.handle != handle);
        before - self.pending.len()
    }

    /// Requests waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Take every resolved decision, in dispatch order.
    pub fn drain_decisions(&mut self) -> Drain<'_, Decision> {
        self.decisions.drain(..)
    }

    /// Resolved decisions not yet drained.
    pub fn ready_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// Telemetry snapshot.
    pub fn stats(&self) -> BatchingStats {
        let (avg_batch_size, avg_dispatch_latency) = if self.total_batches == 0 {
            (0.0, Duration::ZERO)
        } else {
            let batches = u32::try_from(self.total_batches).unwrap_or(u32::MAX);
            (
                self.total_requests as f64 / self.total_batches as f64,
                self.dispatch_time / batches,
            )
        };
        BatchingStats {
            total_batches: self.total_batches,
            total_requests: self.total_requests,
            avg_batch_size,
            avg_dispatch_latency,
            failed_batches: self.failed_batches,
            dropped_requests: self.dropped_requests,
            max_queue_wait: self.max_queue_wait,
            pending: self.pending.len(),
        }
    }

    /// Clear pending requests, undrained decisions, and counters, and
    /// restart the timeout clock at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.pending.clear();
        self.decisions.clear();
        self.last_flush = now;
        self.total_batches = 0;
        self.total_requests = 0;
        self.dispatch_time = Duration::ZERO;
        self.failed_batches = 0;
        self.dropped_requests = 0;
        self.max_queue_wait = Duration::ZERO;
    }
}

impl fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("pending", &self.pending.len())
            .field("decisions", &self.decisions.len())
            .field("total_batches", &self.total_batches)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use warden_test_utils::{FailingBackend, PanicOnceBackend, RecordingBackend, ShortBackend};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn vector(tag: f32) -> EncodedVector {
        let mut s = warden_core::WorldStateSnapshot::default();
        s.owner.position.x = tag;
        warden_obs::ObservationEncoder::new(Default::default())
            .unwrap()
            .encode(&s)
    }

    fn scheduler(backend: Box<dyn InferenceBackend>) -> (BatchScheduler, Instant) {
        let t0 = Instant::now();
        let s = BatchScheduler::new(BatchConfig::default(), backend, t0).unwrap();
        (s, t0)
    }

    #[test]
    fn forced_flush_with_wall_clock() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let (mut s, _) = scheduler(Box::new(backend));
        assert_eq!(s.backend_name(), "recording");
        for i in 0..3 {
            s.enqueue(AgentHandle(i), vector(i as f32));
        }
        assert_eq!(s.flush(true), Ok(3));
        assert_eq!(s.pending(), 0);
        assert_eq!(log.batch_sizes(), vec![3]);
        let got: Vec<AgentHandle> = s.drain_decisions().map(|d| d.handle).collect();
        assert_eq!(got, vec![AgentHandle(0), AgentHandle(1), AgentHandle(2)]);
    }

    #[test]
    fn panicking_backend_leaves_queue_empty() {
        let backend = PanicOnceBackend::new();
        let log = backend.log();
        let (mut s, t0) = scheduler(Box::new(backend));
        s.enqueue_at(AgentHandle(1), vector(1.0), t0);
        s.enqueue_at(AgentHandle(2), vector(2.0), t0);

        let unwound = catch_unwind(AssertUnwindSafe(|| s.flush_at(t0, true)));
        assert!(unwound.is_err());
        assert_eq!(s.pending(), 0, "the panicked batch is not re-sent");

        s.enqueue_at(AgentHandle(3), vector(3.0), t0);
        assert_eq!(s.flush_at(t0, true), Ok(1));
        assert_eq!(log.batch_sizes(), vec![2, 1]);
        assert_eq!(s.drain_decisions().map(|d| d.handle).collect::<Vec<_>>(), vec![AgentHandle(3)]);
    }

    #[test]
    fn timeout_scenario() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let (mut s, t0) = scheduler(Box::new(backend));
        for i in 0..10 {
            s.enqueue_at(AgentHandle(i), vector(0.0), t0);
        }

        assert_eq!(s.flush_at(t0 + ms(2), false), Ok(0));
        assert_eq!(s.pending(), 10);
        assert_eq!(log.calls(), 0);

        assert_eq!(s.flush_at(t0 + ms(5), false), Ok(10));
        assert_eq!(s.pending(), 0);
        assert_eq!(log.batch_sizes(), vec![10]);
        assert_eq!(s.drain_decisions().count(), 10);
    }

    #[test]
    fn empty_flush_never_dispatches_and_resets_timer() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let (mut s, t0) = scheduler(Box::new(backend));
        assert_eq!(s.flush_at(t0 + ms(10), true), Ok(0));
        assert_eq!(log.calls(), 0);

        // Timer restarted at t0 + 10 ms.
        s.enqueue_at(AgentHandle(1), vector(0.0), t0 + ms(11));
        assert!(!s.should_flush(t0 + ms(14)));
        assert!(s.should_flush(t0 + ms(15)));
    }

    #[test]
    fn full_queue_flushes_without_timeout() {
        let (mut s, t0) = scheduler(Box::new(RecordingBackend::new()));
        for i in 0..32 {
            s.enqueue_at(AgentHandle(i), vector(0.0), t0);
        }
        assert!(s.should_flush(t0));
        assert_eq!(s.flush_at(t0, false), Ok(32));
    }

    #[test]
    fn force_flush_ignores_triggers() {
        let (mut s, t0) = scheduler(Box::new(RecordingBackend::new()));
        s.enqueue_at(AgentHandle(1), vector(0.0), t0);
        assert_eq!(s.flush_at(t0, true), Ok(1));
    }

    #[test]
    fn decisions_keep_request_order() {
        let (mut s, t0) = scheduler(Box::new(RecordingBackend::new()));
        for i in 0..5u64 {
            s.enqueue_at(AgentHandle(i), vector(i as f32), t0);
        }
        s.flush_at(t0, true).unwrap();
        let decisions: Vec<Decision> = s.drain_decisions().collect();
        for (i, d) in decisions.iter().enumerate() {
            assert_eq!(d.handle, AgentHandle(i as u64));
            // The recording backend echoes the first element: x / 50.
            assert!((d.action[0] - i as f32 / 50.0).abs() < 1e-6);
        }
        assert_eq!(s.ready_decisions(), 0);
    }

    #[test]
    fn backend_failure_drops_batch_and_counts() {
        let (mut s, t0) = scheduler(Box::new(FailingBackend::new(0)));
        for i in 0..3 {
            s.enqueue_at(AgentHandle(i), vector(0.0), t0);
        }
        let err = s.flush_at(t0, true).unwrap_err();
        assert_eq!(err.dropped, 3);
        assert!(matches!(err.source, BackendError::Failed { .. }));
        assert_eq!(s.pending(), 0);

        let stats = s.stats();
        assert_eq!(stats.failed_batches, 1);
        assert_eq!(stats.dropped_requests, 3);
        assert_eq!(stats.total_batches, 0);
        assert_eq!(stats.avg_batch_size, 0.0);
    }

    #[test]
    fn action_count_mismatch_is_a_failure() {
        let (mut s, t0) = scheduler(Box::new(ShortBackend::new()));
        s.enqueue_at(AgentHandle(1), vector(0.0), t0);
        s.enqueue_at(AgentHandle(2), vector(0.0), t0);
        let err = s.flush_at(t0, true).unwrap_err();
        assert_eq!(
            err.source,
            BackendError::ShapeMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(s.drain_decisions().count(), 0);
    }

    #[test]
    fn stats_average_successful_batches() {
        let (mut s, t0) = scheduler(Box::new(RecordingBackend::new()));
        for i in 0..4 {
            s.enqueue_at(AgentHandle(i), vector(0.0), t0);
        }
        s.flush_at(t0 + ms(3), true).unwrap();
        for i in 0..2 {
            s.enqueue_at(AgentHandle(i), vector(0.0), t0 + ms(3));
        }
        s.flush_at(t0 + ms(10), true).unwrap();

        let stats = s.stats();
        assert_eq!(stats.total_batches, 2);
        assert_eq!(stats.total_requests, 6);
        assert_eq!(stats.avg_batch_size, 3.0);
        assert_eq!(stats.max_queue_wait, ms(7));
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn clear_all_and_discard() {
        let (mut s, t0) = scheduler(Box::new(RecordingBackend::new()));
        for i in 0..4 {
            s.enqueue_at(AgentHandle(i % 2), vector(0.0), t0);
        }
        assert_eq!(s.discard(AgentHandle(0)), 2);
        assert_eq!(s.pending(), 2);
        assert_eq!(s.clear_all(), 2);
        assert_eq!(s.pending(), 0);
        assert_eq!(s.stats().dropped_requests, 0);
    }

    #[test]
    fn zero_batch_size_rejected() {
        let cfg = BatchConfig {
            max_batch_size: 0,
            ..BatchConfig::default()
        };
        assert!(BatchScheduler::new(cfg, Box::new(RecordingBackend::new()), Instant::now()).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn flush_clears_when_queue_is_full(n in 0usize..100) {
                let (mut s, t0) = scheduler(Box::new(RecordingBackend::new()));
                for i in 0..n {
                    s.enqueue_at(AgentHandle(i as u64), EncodedVector::zeroed(), t0);
                }
                let flushed = s.flush_at(t0, false).unwrap();
                if n >= 32 {
                    prop_assert_eq!(flushed, n);
                    prop_assert_eq!(s.pending(), 0);
                } else {
                    prop_assert_eq!(flushed, 0);
                    prop_assert_eq!(s.pending(), n);
                }
            }
        }
    }
}
