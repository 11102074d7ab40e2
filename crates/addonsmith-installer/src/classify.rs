//! Package classification by filename suffix

use addonsmith_core::{Error, PackageKind, Result};

/// Classify a package purely by its lower-cased filename suffix
pub fn classify(filename: &str) -> Result<PackageKind> {
    match filename.rsplit('.').next().map(str::to_lowercase).as_deref() {
        Some("py") => Ok(PackageKind::Script),
        Some("zip") => Ok(PackageKind::Archive),
        _ => Err(Error::unsupported_file(filename)),
    }
}

/// Whether a filename has a recognized package extension
pub fn is_supported(filename: &str) -> bool {
    classify(filename).is_ok()
}
