//! Status command - list cache records without building

use crate::cache::{manifest_path, CacheRecord, Manifest};
use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::Config;
use crate::error::VendorLinkResult;
use crate::link::DllLink;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::path::Path;

/// One manifest record as shown by `status`
#[derive(Debug, Serialize)]
struct RecordStatus {
    fingerprint: String,
    current: bool,
    artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checked_at: Option<String>,
    /// Planned rebuild reason; only known for the current configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    rebuild: Option<String>,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config, project_dir: &Path) -> VendorLinkResult<()> {
    let link = DllLink::new(config, project_dir)?;
    let manifest = Manifest::load_or_default(&manifest_path(&config.link.cache_dir));
    let rows = collect_rows(&manifest, &link);

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.fingerprint);
            }
        }
    }
    Ok(())
}

fn collect_rows(manifest: &Manifest, link: &DllLink) -> Vec<RecordStatus> {
    let current = link.fingerprint();
    let mut rows: Vec<RecordStatus> = manifest
        .config_files
        .iter()
        .filter(|(fingerprint, _)| fingerprint.as_str() != current)
        .map(|(fingerprint, record)| row(fingerprint, record, false, None))
        .collect();

    // The current record comes from the link, so it exists even before the first build
    let rebuild = link.planned_rebuild().map(|reason| reason.to_string());
    rows.insert(0, row(current, &link.record(), true, rebuild));
    rows
}

fn row(
    fingerprint: &str,
    record: &CacheRecord,
    current: bool,
    rebuild: Option<String>,
) -> RecordStatus {
    RecordStatus {
        fingerprint: fingerprint.to_string(),
        current,
        artifacts: record.output_js_names.clone(),
        checked_at: record.checked_at.map(|t| t.to_rfc3339()),
        rebuild,
    }
}

fn print_table(rows: &[RecordStatus]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Vendor bundle cache");

    println!(
        "{:<2} {:<12} {:<30} {:<18} {:<24}",
        "",
        style("FINGERPRINT").bold(),
        style("ARTIFACTS").bold(),
        style("CHECKED").bold(),
        style("STATE").bold()
    );
    println!("{}", "-".repeat(88));

    for row in rows {
        let marker = if row.current { "*" } else { "" };
        let artifacts = if row.artifacts.is_empty() {
            "-".to_string()
        } else {
            row.artifacts.join(", ")
        };
        // Manifest times are RFC 3339; the first 16 chars are `YYYY-MM-DDTHH:MM`
        let checked = row
            .checked_at
            .as_deref()
            .map(|t| t.chars().take(16).collect::<String>().replace('T', " "))
            .unwrap_or_else(|| "-".to_string());
        let state = match (&row.rebuild, row.current) {
            (Some(reason), _) => style(format!("rebuild: {}", reason)).yellow(),
            (None, true) => style("up to date".to_string()).green(),
            (None, false) => style("-".to_string()).dim(),
        };

        println!(
            "{:<2} {:<12} {:<30} {:<18} {:<24}",
            marker, row.fingerprint, artifacts, checked, state
        );
    }

    println!();
    println!("{} record(s), * = current configuration", rows.len());
}
