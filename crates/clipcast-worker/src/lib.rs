//! Clip-to-Shorts run orchestrator.
//!
//! This crate provides:
//! - The per-cycle pipeline (select, download, convert, publish, record)
//! - The dedup ledger and the single-slot manual trigger
//! - The interval/trigger loop and its chat command handler

pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod status;
pub mod trigger;

pub use commands::ChatCommands;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use ledger::DedupLedger;
pub use logging::CycleLogger;
pub use orchestrator::Orchestrator;
pub use pipeline::Pipeline;
pub use status::{StatusBoard, StatusSnapshot};
pub use trigger::ManualTrigger;
