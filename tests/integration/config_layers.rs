//! Layered configuration: global file, workspace files, explicit file, environment.

use crate::integration::test_utils::with_xdg_env;
use docweave::api::Docweave;
use docweave::config::{global_config_path, ConfigLoader};
use docweave::logging::LogFormat;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_global_file_is_read_from_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_xdg_env(&test_dir, || {
        let path = global_config_path().unwrap();
        assert!(path.starts_with(test_dir.path().join("config")));
        write(&path, "fail_fast = true\n\n[logging]\nformat = \"json\"\n");

        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.logging.format, LogFormat::Json);
    });
}

#[test]
fn test_later_layers_override_earlier_ones() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_xdg_env(&test_dir, || {
        write(
            &global_config_path().unwrap(),
            "[storage]\noutput_dir = \"global-docs\"\nwork_dir = \"global-work\"\n",
        );
        write(
            &workspace.path().join("config/config.toml"),
            "[storage]\noutput_dir = \"workspace-docs\"\n",
        );

        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert_eq!(config.storage.output_dir, PathBuf::from("workspace-docs"));
        assert_eq!(config.storage.work_dir, PathBuf::from("global-work"));

        std::env::set_var("DOCWEAVE__STORAGE__OUTPUT_DIR", "env-docs");
        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert_eq!(config.storage.output_dir, PathBuf::from("env-docs"));
    });
}

#[test]
fn test_env_name_selects_environment_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_xdg_env(&test_dir, || {
        write(&workspace.path().join("config/config.toml"), "fail_fast = false\n");
        write(&workspace.path().join("config/ci.toml"), "fail_fast = true\n");

        assert!(!ConfigLoader::load(workspace.path()).unwrap().fail_fast);

        std::env::set_var("DOCWEAVE_ENV", "ci");
        assert!(ConfigLoader::load(workspace.path()).unwrap().fail_fast);
    });
}

#[test]
fn test_explicit_file_sits_between_workspace_and_environment() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let explicit = test_dir.path().join("override.toml");

    with_xdg_env(&test_dir, || {
        write(
            &workspace.path().join("config/config.toml"),
            "[engine]\nprogram = \"workspace-renderer\"\n",
        );
        write(&explicit, "[engine]\nprogram = \"explicit-renderer\"\nargs = [\"--quiet\"]\n");

        let config = ConfigLoader::load_with(workspace.path(), Some(&explicit)).unwrap();
        assert_eq!(config.engine.program, Some(PathBuf::from("explicit-renderer")));
        assert_eq!(config.engine.args, vec!["--quiet".to_string()]);

        std::env::set_var("DOCWEAVE__FAIL_FAST", "true");
        let config = ConfigLoader::load_with(workspace.path(), Some(&explicit)).unwrap();
        assert!(config.fail_fast);
    });
}

#[test]
fn test_open_resolves_storage_against_workspace_root() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_xdg_env(&test_dir, || {
        write(
            &workspace.path().join("config/config.toml"),
            "[storage]\noutput_dir = \"site\"\ncache_path = \"/var/cache/docweave\"\n",
        );
        let docweave = Docweave::open(workspace.path(), None).unwrap();
        assert_eq!(docweave.storage().output_dir, workspace.path().join("site"));
        assert_eq!(docweave.storage().cache_path, PathBuf::from("/var/cache/docweave"));
        assert_eq!(
            docweave.storage().state_path,
            workspace.path().join(".docweave/state")
        );
    });
}

#[test]
fn test_invalid_logging_level_is_rejected_on_open() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_xdg_env(&test_dir, || {
        write(&workspace.path().join("config/config.toml"), "[logging]\nlevel = \"loud\"\n");
        assert!(Docweave::open(workspace.path(), None).is_err());
    });
}

#[test]
fn test_missing_engine_program_is_a_configuration_error() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_xdg_env(&test_dir, || {
        let docweave = Docweave::open(workspace.path(), None).unwrap();
        let err = docweave.process_engine().unwrap_err();
        assert!(err.to_string().contains("engine.program"));
    });
}
