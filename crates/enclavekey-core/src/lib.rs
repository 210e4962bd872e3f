//! # enclavekey-core
//!
//! Core types, error definitions and configuration for `enclavekey`.
//!
//! ## Internal Crate Warning
//!
//! **This crate is an internal implementation detail of `enclavekey`.** The API
//! is unstable and may change between any versions.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and result aliases
//! - [`types`] - Labels, key classes, curve identifiers, access-control
//!   policies, platform status codes and capability levels
//! - [`config`] - Configuration file structures
//! - [`config_loader`] - Loading and saving configuration from `~/.enclavekey`
//!
//! ## Error Handling
//!
//! ```rust
//! use enclavekey_core::error::EnclaveError;
//! use enclavekey_core::types::Status;
//!
//! let err = EnclaveError::signing_failed(Status::AUTH_FAILED);
//! assert_eq!(err.status(), Some(Status::AUTH_FAILED));
//! assert!(err.lookup_url().is_some_and(|url| url.ends_with("-25293")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod types;

pub use error::{ConfigError, EnclaveError, EnclaveResult, KeystoreError};
pub use types::{
    AccessControlPolicy, AccessFlags, Accessibility, Capabilities, CipherSuite, CurveId,
    DeviceState, KeyClass, KeyLabel, PlatformLevel, Status,
};
