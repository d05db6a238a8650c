//! Generation
//!
//! Turns aggregated configurations into rendered output: the renderer boundary,
//! the per-unit driver with staging and promotion, and the level executor.

pub mod driver;
pub mod engine;
pub mod executor;
pub mod plan;

pub use driver::{GenerationDriver, GenerationReport, GenerationUnit, ReportKind};
pub use engine::{
    classify_line, CancelHandle, CancelSignal, Diagnostics, Engine, EngineReport, EngineRequest,
    ExitState, ProcessEngine, Severity,
};
pub use executor::{GenerationExecutor, ModuleOutcome, RunReport};
pub use plan::GenerationPlan;
