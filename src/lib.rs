//! fsinstall - fetch, build and deploy a single-file tool
//!
//! Downloads one source file, packages it into a standalone executable with
//! an external tool, copies the result into a set of install directories and
//! removes the build byproducts.

pub mod build;
pub mod clean;
pub mod config;
pub mod deploy;
pub mod error;
pub mod fetch;
pub mod privilege;
pub mod workflow;

pub use error::{InstallError, Result};
