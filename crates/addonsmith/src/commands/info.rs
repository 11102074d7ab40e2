//! Info command
//!
//! Fetches a package and prints the metadata its entry script declares
//! without installing anything.

use anyhow::{Context, Result};

use addonsmith_installer::inspect_addon;

use crate::cli::InfoArgs;
use crate::output;

pub async fn run(args: InfoArgs) -> Result<()> {
    let spinner = output::spinner(&format!("Inspecting {}", args.reference));
    let result = inspect_addon(&args.reference).await;
    spinner.finish_and_clear();

    let metadata = result.with_context(|| format!("Failed to inspect '{}'", args.reference))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    output::header(metadata.name());
    for (key, value) in metadata.iter() {
        output::kv(key, &value.to_string());
    }

    Ok(())
}
