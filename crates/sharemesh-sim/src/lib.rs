//! # Sharemesh Sim
//!
//! The event-delivery substrate around the gossip core: a full mesh of
//! nodes over in-process channels, per-message link latency from seeded
//! statistical models, and post-run reporting.

pub mod config;
pub mod harness;
pub mod models;
pub mod report;

pub use config::SimConfig;
pub use report::SimSummary;
