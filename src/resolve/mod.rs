//! Cross-module resolution
//!
//! Wires producer/consumer edges between modules built in this run and modules
//! published by earlier runs.

pub mod graph;
pub mod registry;
pub mod resolver;

pub use graph::ModuleGraph;
pub use registry::{ProducerKind, ProducerRegistry};
pub use resolver::{CrossModuleResolver, Resolution, ResolvedModule};
