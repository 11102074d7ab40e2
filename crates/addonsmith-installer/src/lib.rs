//! Package resolution and extraction engine for addonsmith
//!
//! This crate handles:
//! - Reference resolution (GitHub browse links to downloadable URLs)
//! - Remote probe and download
//! - Package classification (single script vs zip archive)
//! - Archive layout resolution (which subtree is the addon)
//! - Staged installation into the target addon directory
//! - Metadata extraction from entry scripts without executing them
//!
//! The pipeline runs once per installation request:
//! resolve -> fetch -> classify -> (install script | plan layout ->
//! install subtree) -> extract metadata -> report.

pub mod classify;
pub mod fetch;
pub mod install;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod resolver;

pub use classify::classify;
pub use fetch::Fetcher;
pub use install::{InstallOptions, Installer};
pub use layout::{ArchiveEntry, LayoutPlan, PlannedEntry, SubtreePlan};
pub use metadata::extract as extract_metadata;
pub use pipeline::{inspect_addon, install_addon, InstallReport};
pub use resolver::resolve;
