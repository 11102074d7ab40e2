//! Staged installation into the target addon directory
//!
//! All content is written to a temporary staging directory created
//! inside the target directory, then renamed into place, so the final
//! move is a same-filesystem rename and a half-written unit is never
//! visible under its final name. When an archive yields several
//! top-level units they are moved one by one; a failure between moves
//! leaves the earlier units in place (documented limitation, no
//! rollback).

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Component, Path, PathBuf};

use addonsmith_core::{Error, InstallOutcome, Metadata, Result};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::layout::SubtreePlan;

/// Entry-point filename renamed to the addon's declared name on install
const ENTRY_POINT: &str = "__init__.py";

/// Per-call installation options
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Directory the host scans for addons
    pub target_dir: PathBuf,

    /// Replace existing files/directories instead of rejecting
    pub overwrite: bool,

    /// Recognized addon search directories; local sources inside any
    /// of these are refused (self-overwrite guard)
    pub search_dirs: Vec<PathBuf>,
}

impl InstallOptions {
    /// Create options targeting a directory, with overwrite disabled
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            overwrite: false,
            search_dirs: Vec::new(),
        }
    }

    /// Enable or disable the overwrite policy
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the recognized addon search directories
    pub fn search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }
}

/// Writes resolved addon content to the target directory
pub struct Installer {
    options: InstallOptions,
}

impl Installer {
    /// Create an installer for one installation call
    pub fn new(options: InstallOptions) -> Self {
        Self { options }
    }

    /// Refuse local sources that live inside an addon directory
    ///
    /// Installing a file over itself would truncate it before reading;
    /// sources already under a search directory are rejected outright.
    pub fn ensure_source_outside_addon_dirs(&self, source: &Path) -> Result<()> {
        let source_dir = match source.parent() {
            Some(parent) => canonical_or_original(parent),
            None => return Ok(()),
        };

        let mut guarded: Vec<&Path> = self.options.search_dirs.iter().map(PathBuf::as_path).collect();
        guarded.push(self.options.target_dir.as_path());

        for dir in guarded {
            if source_dir == canonical_or_original(dir) {
                return Err(Error::invalid_source(source.display().to_string()));
            }
        }
        Ok(())
    }

    /// Install a single-script package
    ///
    /// Scripts named `__init__.py` are renamed to `<name>.py` from the
    /// already-extracted metadata before the write occurs.
    pub fn install_script(&self, filename: &str, content: &[u8], metadata: &Metadata) -> Result<InstallOutcome> {
        let filename = if filename == ENTRY_POINT {
            format!("{}.py", metadata.name())
        } else {
            filename.to_string()
        };

        let staging = self.staging_dir()?;
        let staged = staging.path().join(&filename);
        fs::write(&staged, content)?;

        let destination = self.options.target_dir.join(&filename);
        self.clear_destination(&destination)?;
        fs::rename(&staged, &destination)?;
        info!("Installed script {}", destination.display());

        let module = filename.strip_suffix(".py").unwrap_or(&filename);
        Ok(InstallOutcome::single(module))
    }

    /// Materialize a resolved archive subtree
    pub fn install_subtree<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        plan: &SubtreePlan,
    ) -> Result<InstallOutcome> {
        let staging = self.staging_dir()?;

        for planned in &plan.entries {
            let relative = safe_relative_path(&planned.destination)?;
            let staged = staging.path().join(relative);
            if let Some(parent) = staged.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut entry = archive.by_index(planned.index).map_err(Error::archive)?;
            let mut out = File::create(&staged)?;
            io::copy(&mut entry, &mut out)?;
            debug!("Staged {}", planned.destination);
        }

        let staged_root = staging.path().join(&plan.root_dir);
        let destination = self.options.target_dir.join(&plan.root_dir);
        self.clear_destination(&destination)?;
        fs::rename(&staged_root, &destination)?;
        info!(
            "Installed addon directory {} ({} file(s))",
            destination.display(),
            plan.entries.len()
        );

        Ok(InstallOutcome::single(plan.root_dir.clone()))
    }

    /// Create the staging directory inside the target directory so the
    /// final rename never crosses filesystems
    fn staging_dir(&self) -> Result<tempfile::TempDir> {
        fs::create_dir_all(&self.options.target_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".addonsmith-stage")
            .tempdir_in(&self.options.target_dir)?;
        Ok(staging)
    }

    /// Apply the overwrite-or-reject policy to a destination path
    fn clear_destination(&self, destination: &Path) -> Result<()> {
        if !destination.exists() {
            return Ok(());
        }
        if !self.options.overwrite {
            return Err(Error::already_installed(destination.display().to_string()));
        }
        if destination.is_dir() {
            fs::remove_dir_all(destination)?;
        } else {
            fs::remove_file(destination)?;
        }
        Ok(())
    }
}

/// Validate an archive-derived destination as a plain relative path
fn safe_relative_path(destination: &str) -> Result<PathBuf> {
    let path = Path::new(destination);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(Error::archive(format!(
                    "entry '{}' escapes the target directory",
                    destination
                )))
            }
        }
    }
    Ok(path.to_path_buf())
}

fn canonical_or_original(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use addonsmith_core::Value;
    use tempfile::TempDir;

    fn metadata(name: &str) -> Metadata {
        let mut entries = BTreeMap::new();
        entries.insert("name".to_string(), Value::Str(name.to_string()));
        Metadata::from_entries(entries).unwrap()
    }

    fn installer(target: &Path, overwrite: bool) -> Installer {
        Installer::new(InstallOptions::new(target).overwrite(overwrite))
    }

    #[test]
    fn test_install_script_creates_target_dir() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("scripts").join("addons");

        let outcome = installer(&target, false)
            .install_script("foo.py", b"print('hi')", &metadata("Foo"))
            .unwrap();

        assert_eq!(fs::read(target.join("foo.py")).unwrap(), b"print('hi')");
        assert!(outcome.installed_modules.contains("foo"));
    }

    #[test]
    fn test_entry_point_script_is_renamed_from_metadata() {
        let temp = TempDir::new().unwrap();

        let outcome = installer(temp.path(), false)
            .install_script("__init__.py", b"bl_info = {}", &metadata("My Addon"))
            .unwrap();

        assert!(temp.path().join("My Addon.py").exists());
        assert!(outcome.installed_modules.contains("My Addon"));
    }

    #[test]
    fn test_existing_destination_is_rejected_and_untouched() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("foo.py");
        fs::write(&existing, b"original").unwrap();

        let result = installer(temp.path(), false).install_script(
            "foo.py",
            b"replacement",
            &metadata("Foo"),
        );

        assert!(matches!(result, Err(Error::AlreadyInstalled { .. })));
        assert_eq!(fs::read(&existing).unwrap(), b"original");
    }

    #[test]
    fn test_overwrite_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("foo.py"), b"original").unwrap();

        installer(temp.path(), true)
            .install_script("foo.py", b"replacement", &metadata("Foo"))
            .unwrap();

        assert_eq!(fs::read(temp.path().join("foo.py")).unwrap(), b"replacement");
    }

    #[test]
    fn test_overwrite_replaces_existing_directory_with_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("foo.py")).unwrap();

        installer(temp.path(), true)
            .install_script("foo.py", b"now a file", &metadata("Foo"))
            .unwrap();

        assert!(temp.path().join("foo.py").is_file());
    }

    #[test]
    fn test_no_stray_staging_dirs_remain() {
        let temp = TempDir::new().unwrap();
        installer(temp.path(), false)
            .install_script("foo.py", b"x", &metadata("Foo"))
            .unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["foo.py"]);
    }

    #[test]
    fn test_source_inside_target_dir_is_invalid() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("existing.py");
        fs::write(&source, b"x").unwrap();

        let result = installer(temp.path(), false).ensure_source_outside_addon_dirs(&source);
        assert!(matches!(result, Err(Error::InvalidSource { .. })));
    }

    #[test]
    fn test_source_inside_search_dir_is_invalid() {
        let temp = TempDir::new().unwrap();
        let search = temp.path().join("addons");
        fs::create_dir_all(&search).unwrap();
        let source = search.join("old.py");
        fs::write(&source, b"x").unwrap();

        let target = temp.path().join("target");
        let installer = Installer::new(
            InstallOptions::new(&target).search_dirs(vec![search]),
        );

        assert!(matches!(
            installer.ensure_source_outside_addon_dirs(&source),
            Err(Error::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_source_elsewhere_is_allowed() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("downloads").join("addon.zip");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"x").unwrap();

        let target = temp.path().join("addons");
        assert!(installer(&target, false)
            .ensure_source_outside_addon_dirs(&source)
            .is_ok());
    }

    #[test]
    fn test_safe_relative_path_rejects_traversal() {
        assert!(safe_relative_path("pkg/../../etc/passwd").is_err());
        assert!(safe_relative_path("/absolute/path").is_err());
        assert!(safe_relative_path("pkg/sub/file.py").is_ok());
    }
}
