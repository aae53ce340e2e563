//! Decision-cycle engine for Warden.
//!
//! Decides which agents may use the learned policy, groups their
//! encoded observations into batches for the inference backend, and
//! drives both from a single [`CycleOrchestrator`] that the host ticks
//! from its simulation loop.
//!
//! - [`AdmissionController`] keeps the number of learned-policy agents
//!   under a ceiling that follows measured cycle latency.
//! - [`BatchScheduler`] dispatches pending requests when the batch is
//!   full or the timeout has elapsed.
//! - [`IngressSender`] lets worker threads feed the orchestrator without
//!   sharing its state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod admission;
pub mod batch;
pub mod config;
pub mod cycle;
pub mod ingress;
pub mod metrics;

pub use admission::{AdmissionController, AdmissionDecision, AdmissionReason, Reestimate};
pub use batch::{BatchScheduler, FlushError};
pub use config::{AdmissionConfig, BatchConfig, ConfigError, CycleConfig, EngineConfig};
pub use cycle::{CycleOrchestrator, CycleReport, SpawnOutcome, TickOutcome};
pub use ingress::{IngressMessage, IngressSender};
pub use metrics::{BatchingStats, CycleStats, LimiterStats};
