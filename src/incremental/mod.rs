//! Incremental generation
//!
//! Fingerprints generation inputs, remembers the fingerprint of each module's last
//! promoted output, and keeps a content-addressed cache of output trees so that
//! unchanged modules are skipped or restored instead of re-rendered.

pub mod cache;
pub mod fingerprint;
pub mod planner;
pub mod state;
pub mod walker;

pub use cache::{copy_tree, BuildCache};
pub use fingerprint::{compute_content_hash, fingerprint_configuration, input_paths, Fingerprint};
pub use planner::{GenerateReason, IncrementalPlan, PlanDecision, Planner};
pub use state::{IncrementalState, IncrementalStateStore, SledStateStore, STATE_FORMAT_VERSION};
pub use walker::{Entry, Walker, WalkerConfig};
