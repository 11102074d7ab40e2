//! The installation pipeline
//!
//! One synchronous pass per request: resolve the reference, acquire
//! the package bytes, classify, resolve the archive layout when
//! needed, extract metadata from the entry script, and finally move
//! the staged files into the target directory. Metadata is extracted
//! before anything lands under its final name, so a package without a
//! valid metadata block never reaches the addon directory.

use std::collections::BTreeSet;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;

use addonsmith_core::{Error, FetchResult, Metadata, PackageKind, Result, SourceReference};
use serde::Serialize;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::classify;
use crate::fetch::Fetcher;
use crate::install::{InstallOptions, Installer};
use crate::layout::{self, ArchiveEntry, LayoutPlan};
use crate::metadata;
use crate::resolver;

/// Result of a completed installation
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// Metadata declared by the installed addon's entry script
    pub metadata: Metadata,

    /// Module ids of the newly placed top-level units, ready for the
    /// host's enable/refresh step
    pub installed_modules: BTreeSet<String>,
}

/// Install an addon from a URL or local path
pub async fn install_addon(reference: &str, options: InstallOptions) -> Result<InstallReport> {
    let source = resolver::resolve(reference)?;
    info!("Installing addon from {}", source);

    let installer = Installer::new(options);
    let (fetched, local_source) = acquire(reference, &source).await?;
    if let Some(path) = &local_source {
        installer.ensure_source_outside_addon_dirs(path)?;
    }

    let FetchResult { filename, content } = fetched;
    match classify::classify(&filename)? {
        PackageKind::Script => {
            let meta = extract_script_metadata(&content)?;
            let outcome = installer.install_script(&filename, &content, &meta)?;
            Ok(InstallReport {
                metadata: meta,
                installed_modules: outcome.installed_modules,
            })
        }
        PackageKind::Archive => {
            let mut archive = ZipArchive::new(Cursor::new(content)).map_err(Error::archive)?;
            let entries = index_entries(&mut archive)?;
            let plan = layout::plan(&entries, &filename)?;

            let (meta, outcome) = match plan {
                LayoutPlan::SingleScript { index, filename } => {
                    let script = read_entry(&mut archive, index)?;
                    let meta = extract_script_metadata(&script)?;
                    let outcome = installer.install_script(&filename, &script, &meta)?;
                    (meta, outcome)
                }
                LayoutPlan::Subtree(subtree) => {
                    let script = read_entry(&mut archive, subtree.entry_script_index)?;
                    let meta = extract_script_metadata(&script)?;
                    let outcome = installer.install_subtree(&mut archive, &subtree)?;
                    (meta, outcome)
                }
            };

            Ok(InstallReport {
                metadata: meta,
                installed_modules: outcome.installed_modules,
            })
        }
    }
}

/// Extract an addon's metadata without installing anything
pub async fn inspect_addon(reference: &str) -> Result<Metadata> {
    let source = resolver::resolve(reference)?;
    let (fetched, _) = acquire(reference, &source).await?;

    let FetchResult { filename, content } = fetched;
    match classify::classify(&filename)? {
        PackageKind::Script => extract_script_metadata(&content),
        PackageKind::Archive => {
            let mut archive = ZipArchive::new(Cursor::new(content)).map_err(Error::archive)?;
            let entries = index_entries(&mut archive)?;
            let index = match layout::plan(&entries, &filename)? {
                LayoutPlan::SingleScript { index, .. } => index,
                LayoutPlan::Subtree(subtree) => subtree.entry_script_index,
            };
            let script = read_entry(&mut archive, index)?;
            extract_script_metadata(&script)
        }
    }
}

/// Acquire the package bytes for a resolved source
///
/// Remote references are first probed as given; only when the direct
/// probe yields nothing is the rewritten download URL tried, matching
/// the try-then-resolve behavior users expect from pasted browse
/// links.
async fn acquire(
    raw: &str,
    source: &SourceReference,
) -> Result<(FetchResult, Option<PathBuf>)> {
    match source {
        SourceReference::Local(path) => {
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| {
                    Error::reference(format!("path '{}' has no filename", path.display()))
                })?
                .to_string();
            let content = fs::read(path)?;
            Ok((FetchResult { filename, content }, Some(path.clone())))
        }
        SourceReference::Remote(resolved) => {
            let fetcher = Fetcher::new()?;
            let direct = resolver::normalize_input(raw);

            let (url, filename) = if direct != *resolved {
                probe_with_fallback(&fetcher, direct, resolved).await?
            } else {
                probe_required(&fetcher, resolved).await?
            };

            let fetched = fetcher.fetch(&url, filename).await?;
            Ok((fetched, None))
        }
    }
}

/// Probe the pasted URL first, then the rewritten one
///
/// The direct probe finding no installable file is the expected case
/// for browse links and falls back quietly; a transport failure is
/// logged before the fallback so an outage is not misreported as a
/// failure of the rewritten URL.
async fn probe_with_fallback(
    fetcher: &Fetcher,
    direct: String,
    resolved: &str,
) -> Result<(String, String)> {
    match fetcher.probe(&direct).await {
        Ok(Some(filename)) => Ok((direct, filename)),
        Ok(None) => {
            debug!(
                "Direct probe of '{}' found no installable file, trying resolved URL",
                direct
            );
            probe_required(fetcher, resolved).await
        }
        Err(err) => {
            warn!(
                "Direct probe of '{}' failed ({}), trying resolved URL",
                direct, err
            );
            probe_required(fetcher, resolved).await
        }
    }
}

/// Probe a URL that must name an installable package
async fn probe_required(fetcher: &Fetcher, url: &str) -> Result<(String, String)> {
    match fetcher.probe(url).await? {
        Some(filename) => Ok((url.to_string(), filename)),
        None => {
            let last_segment = url.rsplit('/').next().unwrap_or(url);
            Err(Error::unsupported_file(last_segment))
        }
    }
}

fn extract_script_metadata(content: &[u8]) -> Result<Metadata> {
    let text = String::from_utf8_lossy(content);
    metadata::extract(&text)
}

/// Build the archive index, dropping macOS resource-fork side files
fn index_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive.by_index(index).map_err(Error::archive)?;
        let path = file.name().replace('\\', "/");
        if path.split('/').any(|component| component == "__MACOSX") {
            continue;
        }
        entries.push(ArchiveEntry::new(index, path, file.is_dir()));
    }
    Ok(entries)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<Vec<u8>> {
    let mut entry = archive.by_index(index).map_err(Error::archive)?;
    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_direct_probe_success_wins_over_resolved_url() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/files/tool.py"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "text/plain"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let direct = format!("{}/files/tool.py", server.uri());
        let (url, filename) =
            probe_with_fallback(&fetcher, direct.clone(), "http://127.0.0.1:1/unused")
                .await
                .unwrap();

        assert_eq!(url, direct);
        assert_eq!(filename, "tool.py");
    }

    #[tokio::test]
    async fn test_fallback_when_direct_probe_finds_no_package() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/browse"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/dl/addon.zip"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "application/zip"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let direct = format!("{}/browse", server.uri());
        let resolved = format!("{}/dl/addon.zip", server.uri());
        let (url, filename) = probe_with_fallback(&fetcher, direct, &resolved)
            .await
            .unwrap();

        assert_eq!(url, resolved);
        assert_eq!(filename, "addon.zip");
    }

    #[tokio::test]
    async fn test_fallback_when_direct_probe_cannot_connect() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/repo/archive/refs/heads/master.zip"))
            .respond_with(ResponseTemplate::new(200).insert_header(
                "content-disposition",
                "attachment; filename=\"repo-master.zip\"",
            ))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        // Port 1 is not listening; the direct probe fails at connect.
        let direct = "http://127.0.0.1:1/browse".to_string();
        let resolved = format!("{}/repo/archive/refs/heads/master.zip", server.uri());
        let (url, filename) = probe_with_fallback(&fetcher, direct, &resolved)
            .await
            .unwrap();

        assert_eq!(url, resolved);
        assert_eq!(filename, "repo-master.zip");
    }

    #[tokio::test]
    async fn test_transport_failure_on_both_urls_surfaces() {
        let fetcher = Fetcher::new().unwrap();
        let result = probe_with_fallback(
            &fetcher,
            "http://127.0.0.1:1/browse".to_string(),
            "http://127.0.0.1:1/resolved.zip",
        )
        .await;

        assert!(matches!(result, Err(Error::Transport { .. })));
    }
}
