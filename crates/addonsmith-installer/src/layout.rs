//! Archive layout resolution
//!
//! Given the raw file listing of an archive, decides which subtree
//! constitutes one installable addon unit:
//! - a lone non-entry-point script makes the archive a transparent
//!   wrapper around a single-script package
//! - otherwise the shallowest `__init__.py` marks the addon root, and
//!   only entries under its directory are materialized
//!
//! Archives frequently bundle unrelated content (readmes, licenses,
//! CI configuration); everything outside the chosen subtree is
//! ignored.

use addonsmith_core::{Error, Result};
use tracing::{debug, warn};

/// Entry-point filename marking an addon package root
const ENTRY_POINT: &str = "__init__.py";

/// Filename prefix reserved for entry-point style scripts
const RESERVED_PREFIX: &str = "__";

/// One entry of an archive's index
///
/// Paths are relative and `/`-separated, exactly as stored in the
/// archive. `index` is the position in the archive index, used later
/// to retrieve the entry's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub path: String,
    pub is_dir: bool,
}

impl ArchiveEntry {
    pub fn new(index: usize, path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            index,
            path: path.into(),
            is_dir,
        }
    }

    fn is_script(&self) -> bool {
        !self.is_dir && self.path.to_lowercase().ends_with(".py")
    }

    fn base_name(&self) -> &str {
        base_name(&self.path)
    }

    fn parent_dir(&self) -> &str {
        parent_dir(&self.path)
    }
}

/// An archive entry with its computed destination path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Index into the archive
    pub index: usize,
    /// Destination path relative to the target directory
    pub destination: String,
}

/// Resolved plan for one addon subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreePlan {
    /// Top-level directory created under the target directory; doubles
    /// as the installed module id
    pub root_dir: String,
    /// Archive index of the entry-point script
    pub entry_script_index: usize,
    /// Every entry to materialize, with renamed destination paths
    pub entries: Vec<PlannedEntry>,
}

/// Result of archive layout resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutPlan {
    /// The archive wraps exactly one standalone script; install it as
    /// a plain `.py` file, parent directories stripped
    SingleScript { index: usize, filename: String },
    /// Extract the chosen entry-point subtree
    Subtree(SubtreePlan),
}

/// Resolve which archive entries constitute the addon
///
/// `archive_display_name` is the archive's own filename; it names the
/// installed directory when the entry point sits at archive root.
pub fn plan(entries: &[ArchiveEntry], archive_display_name: &str) -> Result<LayoutPlan> {
    let scripts: Vec<&ArchiveEntry> = entries.iter().filter(|e| e.is_script()).collect();
    if scripts.is_empty() {
        return Err(Error::NoScriptsFound);
    }

    // A lone script that is not itself an entry-point file makes the
    // archive wrapper transparent.
    if scripts.len() == 1 {
        let script = scripts[0];
        let filename = script.base_name();
        if !filename.starts_with(RESERVED_PREFIX) {
            debug!("Archive wraps a single script: {}", script.path);
            return Ok(LayoutPlan::SingleScript {
                index: script.index,
                filename: filename.to_string(),
            });
        }
    }

    // Multiple scripts: an __init__.py must designate the addon root.
    let mut init_files: Vec<&ArchiveEntry> = scripts
        .iter()
        .filter(|e| e.base_name() == ENTRY_POINT)
        .copied()
        .collect();
    if init_files.is_empty() {
        return Err(Error::ambiguous_layout(scripts.len()));
    }

    // Shallower/earlier-in-tree entries first, ties broken lexically.
    init_files.sort_by(|a, b| {
        (a.parent_dir(), a.base_name()).cmp(&(b.parent_dir(), b.base_name()))
    });
    let chosen = init_files[0];
    if init_files.len() > 1 {
        let skipped: Vec<&str> = init_files[1..].iter().map(|e| e.path.as_str()).collect();
        warn!(
            "Archive bundles {} addon roots; installing '{}' and skipping {:?}",
            init_files.len(),
            chosen.path,
            skipped
        );
    }

    let parent = chosen.parent_dir();
    debug!(
        "Chosen entry point '{}' (parent dir '{}')",
        chosen.path, parent
    );

    // Name the installed directory: the archive's own stem for a
    // root-level entry point, otherwise the parent dir flattened into
    // a single module-safe component.
    let root_dir = if parent.is_empty() {
        stem(archive_display_name).to_string()
    } else {
        parent.replace('/', "-").replace('.', "_")
    };

    let planned = if parent.is_empty() {
        // Root-level entry point: the unit is the entry script alone;
        // top-level siblings are unrelated bundle content.
        vec![PlannedEntry {
            index: chosen.index,
            destination: format!("{}/{}", root_dir, ENTRY_POINT),
        }]
    } else {
        let prefix = format!("{}/", parent);
        entries
            .iter()
            .filter(|e| !e.is_dir && e.path.starts_with(prefix.as_str()))
            .map(|e| {
                let relative = e.path[prefix.len()..].trim_start_matches('/');
                PlannedEntry {
                    index: e.index,
                    destination: format!("{}/{}", root_dir, relative),
                }
            })
            .collect()
    };

    let entry_script_destination = format!("{}/{}", root_dir, ENTRY_POINT);
    let entry_script_index = planned
        .iter()
        .find(|p| p.destination == entry_script_destination)
        .map(|p| p.index)
        .unwrap_or(chosen.index);

    Ok(LayoutPlan::Subtree(SubtreePlan {
        root_dir,
        entry_script_index,
        entries: planned,
    }))
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn stem(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
}
