//! Check command - rebuild the vendor bundle when needed

use crate::bundle::{CommandEngine, OutputCallback, ReferenceManifest};
use crate::cli::args::CheckArgs;
use crate::config::{Config, LinkMode};
use crate::error::VendorLinkResult;
use crate::link::{CheckOutcome, DllLink, HtmlAssets};
use crate::ui::{self, BuildProgress, UiContext};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Machine-readable result of a check
#[derive(Debug, Serialize)]
struct CheckReport {
    fingerprint: String,
    rebuilt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    artifacts: Vec<String>,
    tracked: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_tag: Option<String>,
    html_assets: HtmlAssets,
    reference_manifests: Vec<ReferenceManifest>,
}

/// Execute the check command
pub async fn execute(args: CheckArgs, config: &Config, project_dir: &Path) -> VendorLinkResult<()> {
    let ctx = UiContext::detect().with_machine_output(args.json);
    let mut link = DllLink::new(config, project_dir)?.with_force(args.force);

    ui::intro(&ctx, "vendorlink check");
    ui::key_value(&ctx, "Fingerprint", link.fingerprint());

    let progress = link.planned_rebuild().map(|reason| {
        ui::step_info(&ctx, &format!("Rebuilding vendor bundle: {}", reason));
        BuildProgress::new(&ctx, link.fingerprint())
    });

    let mut engine = CommandEngine::new(&config.engine, project_dir, &link.cache_paths().root);
    if let Some(progress) = progress.clone() {
        let callback: OutputCallback = Arc::new(move |line: String| progress.on_line(line));
        engine = engine.with_progress(callback);
    }

    let result = link.check(&engine).await;
    if let Some(progress) = &progress {
        progress.finish();
    }
    let outcome = result?;

    if args.json {
        return print_report(&link, &outcome);
    }

    match &outcome {
        CheckOutcome::Rebuilt { reason, assets } => ui::step_ok_detail(
            &ctx,
            &format!("Vendor bundle rebuilt ({} artifacts)", assets.len()),
            &reason.to_string(),
        ),
        CheckOutcome::Cached | CheckOutcome::AlreadyChecked => {
            ui::step_ok(&ctx, "Vendor bundle is up to date")
        }
    }

    ui::key_value(&ctx, "Tracked", &link.tracked_names().join(", "));
    if let Some(tag) = link.version_tag() {
        ui::key_value(&ctx, "Version", &tag);
    }
    match link.mode() {
        LinkMode::Copy => ui::remark(
            &ctx,
            &format!("Copied to {}", config.build.output.path.display()),
        ),
        LinkMode::Html | LinkMode::Assets => ui::remark(
            &ctx,
            &format!("Artifacts kept in {}", link.cache_paths().js.display()),
        ),
    }

    ui::outro_success(&ctx, "Done");
    Ok(())
}

fn print_report(link: &DllLink, outcome: &CheckOutcome) -> VendorLinkResult<()> {
    let reason = match outcome {
        CheckOutcome::Rebuilt { reason, .. } => Some(reason.to_string()),
        _ => None,
    };
    let report = CheckReport {
        fingerprint: link.fingerprint().to_string(),
        rebuilt: outcome.rebuilt(),
        reason,
        artifacts: link.cached_names().to_vec(),
        tracked: link.tracked_names().to_vec(),
        version_tag: link.version_tag(),
        html_assets: link.html_assets(HtmlAssets::default()),
        reference_manifests: link.reference_manifests(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
