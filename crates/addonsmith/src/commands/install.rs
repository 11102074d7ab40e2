//! Install command
//!
//! Resolves the target addon directory, runs the installation pipeline
//! and reports what was placed there.

use anyhow::{Context, Result};

use addonsmith_core::AddonDirKind;
use addonsmith_installer::{install_addon, InstallOptions};

use crate::cli::InstallArgs;
use crate::output;

pub async fn run(args: InstallArgs) -> Result<()> {
    let target_dir = match &args.target_dir {
        Some(dir) => dir.clone(),
        None => args.dir.resolve()?,
    };

    let options = InstallOptions::new(&target_dir)
        .overwrite(args.overwrite)
        .search_dirs(AddonDirKind::search_dirs());

    let spinner = output::spinner(&format!("Installing {}", args.reference));
    let result = install_addon(&args.reference, options).await;
    spinner.finish_and_clear();

    let report = result.with_context(|| format!("Failed to install '{}'", args.reference))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::success(&format!(
        "Installed '{}' into {}",
        report.metadata.name(),
        target_dir.display()
    ));
    for module in &report.installed_modules {
        output::kv("module", module);
    }

    Ok(())
}
