//! Core library for addonsmith
//!
//! This crate provides the shared building blocks used by the
//! installer engine and the CLI:
//! - Error taxonomy for the installation pipeline
//! - Data model types (source references, fetched packages, metadata)
//! - Addon directory selection

pub mod dirs;
pub mod error;
pub mod types;

pub use dirs::AddonDirKind;
pub use error::{Error, Result};
pub use types::{FetchResult, InstallOutcome, Metadata, PackageKind, SourceReference, Value};
