//! Docweave: multi-module documentation configuration aggregation
//!
//! Builds per-source-set documentation parameters, wires producer/consumer edges
//! between modules, aggregates them into one deterministic configuration per
//! generation unit, and drives an external renderer incrementally.

pub mod aggregate;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod incremental;
pub mod logging;
pub mod manifest;
pub mod parameters;
pub mod resolve;
pub mod types;
