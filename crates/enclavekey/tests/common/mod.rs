//! # Test Utilities for Enclavekey
//!
//! - [`unattended_dir`] - A temporary base directory whose configuration
//!   never asks for user presence
//! - [`write_config`] - Write an arbitrary configuration file

#![allow(dead_code)]
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use enclavekey_core::config::Config;
use enclavekey_core::config_loader::ConfigLoader;
use tempfile::TempDir;

/// Create a base directory with a configuration that skips presence checks.
pub fn unattended_dir() -> TempDir {
    let temp = TempDir::new().expect("temp dir");
    let config = Config::builder().user_presence(false).build();
    ConfigLoader::with_base_dir(temp.path().to_path_buf())
        .save(&config)
        .expect("save config");
    temp
}

/// Write `contents` to `<dir>/<name>` and return the path.
pub fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write config");
    path
}
