//! Reference resolution
//!
//! Normalizes a raw user input (URL or filesystem path) into a
//! canonical fetchable URL or a local path. GitHub browse links are
//! rewritten into direct-download form:
//!
//! ```text
//! https://github.com/owner/repo/blob/main/__init__.py
//!   -> https://github.com/owner/repo/raw/main/__init__.py
//!
//! https://github.com/owner/repo/tree/main
//!   -> https://github.com/owner/repo/archive/refs/heads/main.zip
//! ```
//!
//! When no `tree` segment names a branch, `master` is used; GitHub
//! redirects it to the repository's actual default branch.

use std::path::PathBuf;

use addonsmith_core::{Error, Result, SourceReference};
use tracing::debug;
use url::Url;

/// Branch used when a repository reference does not name one
const DEFAULT_BRANCH: &str = "master";

/// Normalize raw user input: trim whitespace and surrounding quotes,
/// use forward slashes, and drop any trailing separator.
pub fn normalize_input(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_string()
}

/// Resolve a raw reference into a canonical source
pub fn resolve(raw: &str) -> Result<SourceReference> {
    let input = normalize_input(raw);

    if input.starts_with("http://") || input.starts_with("https://") {
        let resolved = rewrite_known_hosts(&input)?;
        if resolved != input {
            debug!("Resolved '{}' to '{}'", input, resolved);
        }
        Ok(SourceReference::Remote(resolved))
    } else {
        Ok(SourceReference::Local(PathBuf::from(input)))
    }
}

/// Rewrite browse URLs of known hosting services into download URLs.
/// Unknown hosts pass through unchanged.
fn rewrite_known_hosts(input: &str) -> Result<String> {
    let parsed = Url::parse(input)
        .map_err(|e| Error::reference(format!("cannot parse URL '{}': {}", input, e)))?;

    match parsed.host_str() {
        Some("github.com") => rewrite_github(&parsed),
        // Extension point for other hosting services
        _ => Ok(input.to_string()),
    }
}

/// Rewrite a github.com browse URL into a raw-file or archive URL
fn rewrite_github(parsed: &Url) -> Result<String> {
    let path = parsed.path().trim_matches('/').to_string();
    let mut comps: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();

    if path.ends_with(".py") {
        // Direct file reference: swap the view segment for raw content,
        // keeping owner, repo, branch and file path untouched.
        if comps.len() > 2 {
            comps[2] = "raw";
        }
        let mut rewritten = parsed.clone();
        rewritten.set_path(&comps.join("/"));
        return Ok(rewritten.into());
    }

    // Whole-repository reference: derive the branch archive URL.
    if comps.len() < 2 {
        return Err(Error::reference(format!(
            "GitHub URL '{}' does not name an owner and repository",
            parsed
        )));
    }

    let branch = comps
        .iter()
        .position(|c| *c == "tree")
        .and_then(|idx| comps.get(idx + 1))
        .copied()
        .unwrap_or(DEFAULT_BRANCH);

    let mut rewritten = parsed.clone();
    rewritten.set_path(&format!(
        "{}/{}/archive/refs/heads/{}.zip",
        comps[0], comps[1], branch
    ));
    Ok(rewritten.into())
}
