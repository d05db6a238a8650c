//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key: defaults, global file,
/// workspace files, explicit file, environment.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("storage.output_dir", "build/docs")?
        .set_default("storage.work_dir", ".docweave/work")?
        .set_default("storage.state_path", ".docweave/state")?
        .set_default("storage.cache_path", ".docweave/cache")?
        .set_default("fail_fast", false)
}
