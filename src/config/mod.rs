// src/config/mod.rs

//! Workflow files.
//!
//! - [`model`] holds the TOML-backed data model.
//! - [`loader`] reads a file from disk.
//! - [`validate`] checks references and reachability, producing a
//!   [`ConfigFile`] that can be turned into a [`Workflow`](crate::model::Workflow).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{AuthConfig, ConfigFile, ConfigSection, RawConfigFile, TaskConfig, WorkflowSection};
