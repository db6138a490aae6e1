//! Export command: package the manifest and its configs as a bundle.

use camino::Utf8PathBuf;

use rigup_bundle::{export_bundle, BundleMetadata};
use rigup_core::jsonc;
use rigup_core::manifest::ManifestFile;

use crate::cli::ExportArgs;
use crate::commands::CommandContext;
use crate::output;

pub async fn run(args: ExportArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    let (resolved, _) = ctx.resolve(None)?;

    let out = match &args.out {
        Some(out) => out.clone(),
        None => {
            let stem = resolved.name.as_deref().unwrap_or("manifest");
            Utf8PathBuf::from(format!("{stem}.rigup.zip"))
        }
    };

    let mut metadata = BundleMetadata::new(&ctx.timestamp_utc, env!("CARGO_PKG_VERSION"));
    // Module names come from the authored root manifest; the resolved
    // form has already flattened them away.
    if let Ok(content) = std::fs::read_to_string(&ctx.manifest) {
        if let Ok(root) = jsonc::from_str::<ManifestFile>(&content) {
            metadata.included_modules = root.modules;
            metadata
                .included_modules
                .extend(root.bundles.iter().cloned());
        }
    }

    let spinner = (!ctx.json).then(|| output::spinner("Exporting bundle..."));
    let summary = export_bundle(&out, &ctx.manifest_dir(), &resolved, metadata)?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if !ctx.json {
        output::success(&format!(
            "Bundle written to {} ({} files, {} skipped)",
            summary.bundle_path, summary.files, summary.skipped
        ));
        output::kv("checksum", &summary.checksum);
    }

    Ok(serde_json::json!({
        "bundle": summary.bundle_path,
        "checksum": summary.checksum,
        "files": summary.files,
        "skipped": summary.skipped,
    }))
}
