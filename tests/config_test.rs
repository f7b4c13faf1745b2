//! Integration tests for Settings config loading with layered precedence.
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;

use tempfile::TempDir;

use clonemerge::application::ApplicationError;
use clonemerge::config::Settings;
use clonemerge::domain::BOUNDARY_RESOLUTION;

#[test]
fn given_no_local_config_when_load_then_uses_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    // Act
    let settings = Settings::load(Some(&missing)).expect("load settings");

    // Assert
    assert_eq!(settings.merge.boundary_resolution, BOUNDARY_RESOLUTION);
}

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("trees.toml");
    let config = format!(
        "store_path = \"{}\"\n\n[merge]\nboundary_resolution = 250\n",
        store.display()
    );
    let config_path = dir.path().join("clonemerge.toml");
    fs::write(&config_path, config).unwrap();

    // Act
    let settings = Settings::load(Some(&config_path)).expect("load settings");

    // Assert
    assert_eq!(settings.store_path, store);
    assert_eq!(settings.merge.boundary_resolution, 250);
}

#[test]
fn given_partial_local_config_when_load_then_keeps_other_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("clonemerge.toml");
    fs::write(&config_path, "[merge]\nboundary_resolution = 0\n").unwrap();
    let defaults = Settings::load(None).expect("load defaults");

    // Act
    let settings = Settings::load(Some(&config_path)).expect("load settings");

    // Assert
    assert_eq!(settings.merge.boundary_resolution, 0);
    assert_eq!(settings.store_path, defaults.store_path);
}

#[test]
fn given_tilde_in_store_path_when_load_then_expands_home() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("clonemerge.toml");
    fs::write(&config_path, "store_path = \"~/clonemerge/store.toml\"\n").unwrap();

    // Act
    let settings = Settings::load(Some(&config_path)).expect("load settings");

    // Assert
    assert!(settings.store_path.ends_with("clonemerge/store.toml"));
    if let Some(dirs) = directories::BaseDirs::new() {
        assert!(settings.store_path.starts_with(dirs.home_dir()));
    }
}

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("clonemerge.toml");
    fs::write(&config_path, "[merge\nboundary_resolution = ").unwrap();

    // Act
    let result = Settings::load(Some(&config_path));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}
