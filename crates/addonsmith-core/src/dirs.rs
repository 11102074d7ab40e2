//! Addon directory selection
//!
//! The host application discovers addons in a small set of well-known
//! directories. The CLI lets the user pick one by kind; the
//! `ADDONSMITH_ADDON_HOME` environment variable overrides the user
//! directory, e.g. to point straight at a Blender `scripts/addons`
//! tree.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable overriding the user addon directory
pub const ADDON_HOME_ENV: &str = "ADDONSMITH_ADDON_HOME";

/// Enumerated install target, resolved to a concrete path per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddonDirKind {
    /// Per-user addon directory (default)
    User,
    /// System-wide addon directory
    System,
}

impl AddonDirKind {
    /// Resolve this kind to a concrete addon directory
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            AddonDirKind::User => {
                if let Ok(home) = std::env::var(ADDON_HOME_ENV) {
                    return Ok(PathBuf::from(home));
                }
                let data_dir = dirs::data_dir().ok_or_else(|| {
                    Error::reference("could not determine the user data directory")
                })?;
                Ok(data_dir.join("addonsmith").join("addons"))
            }
            AddonDirKind::System => Ok(PathBuf::from("/usr/local/share/addonsmith/addons")),
        }
    }

    /// All recognized addon search directories
    ///
    /// Used by the installer to refuse local sources that already live
    /// inside an addon directory (the self-overwrite guard).
    pub fn search_dirs() -> Vec<PathBuf> {
        [AddonDirKind::User, AddonDirKind::System]
            .iter()
            .filter_map(|kind| kind.resolve().ok())
            .collect()
    }
}

impl std::fmt::Display for AddonDirKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddonDirKind::User => write!(f, "user"),
            AddonDirKind::System => write!(f, "system"),
        }
    }
}

impl FromStr for AddonDirKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(AddonDirKind::User),
            "system" => Ok(AddonDirKind::System),
            other => Err(Error::unknown_addon_dir(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("user".parse::<AddonDirKind>().unwrap(), AddonDirKind::User);
        assert_eq!(
            "SYSTEM".parse::<AddonDirKind>().unwrap(),
            AddonDirKind::System
        );
        assert!(matches!(
            "preferences".parse::<AddonDirKind>(),
            Err(Error::UnknownAddonDir { .. })
        ));
    }

    #[test]
    fn test_kind_display_round_trip() {
        for kind in [AddonDirKind::User, AddonDirKind::System] {
            assert_eq!(kind.to_string().parse::<AddonDirKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_system_dir_is_fixed() {
        let dir = AddonDirKind::System.resolve().unwrap();
        assert_eq!(dir, PathBuf::from("/usr/local/share/addonsmith/addons"));
    }
}
