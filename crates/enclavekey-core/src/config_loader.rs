//! Locating, reading and writing `config.toml`.
//!
//! Everything lives under one base directory, `~/.enclavekey` unless told
//! otherwise. A missing file is not an error for [`ConfigLoader::load`]; the
//! built-in defaults apply.
//!
//! ```no_run
//! use enclavekey_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("home directory");
//! if !loader.exists() {
//!     loader.write_default().expect("writable base dir");
//! }
//! let config = loader.load().expect("valid config");
//! println!("{}", config.keys.public_label);
//! ```
//!
//! Relative paths in the file are taken relative to the base directory:
//!
//! ```
//! use enclavekey_core::config_loader::ConfigLoader;
//! use std::path::{Path, PathBuf};
//!
//! let loader = ConfigLoader::with_base_dir(PathBuf::from("/srv/enclavekey"));
//! let keystore = loader.resolve_path("keystore").expect("resolvable");
//! assert_eq!(keystore, Path::new("/srv/enclavekey/keystore"));
//! ```

use crate::config::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const CONFIG_FILE_NAME: &str = "config.toml";
const BASE_DIR_NAME: &str = ".enclavekey";

/// Reads and writes `config.toml` under one base directory.
///
/// The base directory also anchors relative paths found in the
/// configuration; see [`resolve_path`](Self::resolve_path).
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader rooted at `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoHomeDirectory`] when `$HOME` is unknown.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self::with_base_dir(default_base_dir()?))
    }

    /// Loader rooted at `base_dir`.
    #[must_use]
    pub const fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// `<base_dir>/config.toml`.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// The directory this loader is rooted at.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Turn a path from the configuration into a usable one.
    ///
    /// `~` is expanded to the home directory, absolute paths are returned
    /// unchanged and relative paths are joined onto the base directory.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoHomeDirectory`] for a `~` path when `$HOME` is
    /// unknown.
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf, ConfigError> {
        let expanded = expand_path(path)?;
        Ok(if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        })
    }

    /// Read `config.toml`, or the defaults when there is none.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file exists but cannot be read and
    /// [`ConfigError::ParseFailed`] if it is not valid TOML.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let path = self.config_path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Config::default())
        }
    }

    /// Read `config.toml`, which must exist.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileNotFound`] when it is missing; otherwise as
    /// [`load`](Self::load).
    pub fn load_required(&self) -> Result<Config, ConfigError> {
        let path = self.config_path();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()));
        }
        Self::load_from_path(&path)
    }

    /// Read a configuration file at an arbitrary location.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::ParseFailed`] if it is not valid TOML.
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(format!("cannot read {}", path.display()), e))?;
        toml::from_str(&text).map_err(|e| {
            ConfigError::parse_failed(format!("{} is not valid TOML: {e}", path.display()))
        })
    }

    /// Serialize `config` and replace `config.toml` with it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ParseFailed`] if serialization fails and
    /// [`ConfigError::Io`] if the file cannot be written.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::parse_failed(format!("cannot serialize config: {e}")))?;
        self.replace_file(&text)
    }

    /// Write the commented defaults from [`Config::default_toml`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be written.
    pub fn write_default(&self) -> Result<(), ConfigError> {
        self.replace_file(&Config::default_toml())
    }

    /// Whether `config.toml` is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }

    /// Write through a temporary sibling and rename over the target. A new
    /// base directory is created owner-only.
    fn replace_file(&self, text: &str) -> Result<(), ConfigError> {
        let dir = &self.base_dir;
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| ConfigError::io(format!("cannot create {}", dir.display()), e))?;
            #[cfg(unix)]
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
                .map_err(|e| ConfigError::io(format!("cannot restrict {}", dir.display()), e))?;
        }

        let target = self.config_path();
        let staging = dir.join(format!(".{CONFIG_FILE_NAME}.tmp"));
        fs::write(&staging, text)
            .map_err(|e| ConfigError::io(format!("cannot write {}", staging.display()), e))?;
        fs::rename(&staging, &target)
            .map_err(|e| ConfigError::io(format!("cannot replace {}", target.display()), e))
    }
}

/// Expand a leading `~` or `~/`. Other paths pass through untouched.
///
/// # Errors
///
/// [`ConfigError::NoHomeDirectory`] for a `~` path when `$HOME` is unknown.
///
/// ```
/// use enclavekey_core::config_loader::expand_path;
///
/// let path = expand_path("/etc/enclavekey/config.toml").expect("absolute path");
/// assert_eq!(path.to_string_lossy(), "/etc/enclavekey/config.toml");
/// ```
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    let home = || dirs::home_dir().ok_or_else(ConfigError::no_home_directory);
    match path.strip_prefix('~') {
        Some("") => home(),
        Some(rest) if rest.starts_with('/') => Ok(home()?.join(&rest[1..])),
        _ => Ok(PathBuf::from(path)),
    }
}

/// `~/.enclavekey`.
///
/// # Errors
///
/// [`ConfigError::NoHomeDirectory`] when `$HOME` is unknown.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    expand_path("~").map(|home| home.join(BASE_DIR_NAME))
}

/// Shorthand for `ConfigLoader::new()?.load()`.
///
/// # Errors
///
/// As [`ConfigLoader::new`] and [`ConfigLoader::load`].
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new()?.load()
}
