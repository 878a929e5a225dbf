use std::path::Path;

use anyhow::Result;
use ratchet_db::{MigrationReceipt, MigrationStatus};
use serde::Serialize;

const WIDTH: usize = 60;
const LABEL_W: usize = 12;

/// JSON shape of a migration run.
#[derive(Debug, Serialize)]
struct ReceiptSummary<'a> {
    database: &'a Path,
    from_version: u32,
    version: u32,
    applied: u32,
    failed_version: Option<u32>,
    error: Option<String>,
}

impl<'a> ReceiptSummary<'a> {
    fn new(database: &'a Path, receipt: &MigrationReceipt) -> Self {
        Self {
            database,
            from_version: receipt.from_version,
            version: receipt.version,
            applied: receipt.applied(),
            failed_version: receipt.error.as_ref().and_then(|e| e.version()),
            error: receipt.error.as_ref().map(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusSummary<'a> {
    database: &'a Path,
    #[serde(flatten)]
    status: MigrationStatus,
}

pub fn print_status(database: &Path, status: &MigrationStatus, json: bool) -> Result<()> {
    if json {
        let summary = StatusSummary {
            database,
            status: *status,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let state = if status.is_ahead() {
        "ahead of known migrations"
    } else if status.is_up_to_date() {
        "up to date"
    } else {
        "pending"
    };
    print_box(
        "status",
        &[
            ("Database", database.display().to_string()),
            ("Current", status.current.to_string()),
            ("Latest", status.latest.to_string()),
            ("Pending", status.pending.to_string()),
            ("State", state.to_string()),
        ],
    );
    Ok(())
}

pub fn print_receipt(database: &Path, receipt: &MigrationReceipt, json: bool) -> Result<()> {
    let summary = ReceiptSummary::new(database, receipt);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut rows = vec![
        ("Database", database.display().to_string()),
        (
            "Version",
            format!("{} -> {}", summary.from_version, summary.version),
        ),
        ("Applied", summary.applied.to_string()),
    ];
    match &summary.error {
        None => rows.push(("Result", "ok".to_string())),
        Some(err) => {
            if let Some(v) = summary.failed_version {
                rows.push(("Failed at", v.to_string()));
            }
            rows.push(("Error", err.clone()));
        }
    }
    print_box("migrate", &rows);
    Ok(())
}

fn print_box(title: &str, rows: &[(&str, String)]) {
    for line in render_box(title, rows) {
        println!("{line}");
    }
}

fn render_box(title: &str, rows: &[(&str, String)]) -> Vec<String> {
    let version = env!("CARGO_PKG_VERSION");
    let title = format!("ratchet v{version} · {title}");
    let label_w = LABEL_W;
    let value_w = WIDTH - label_w - 4; // "│ " + " │"

    let title_dashes = WIDTH.saturating_sub(title.chars().count() + 7); // "╭─── " + " " + "╮"
    let mut lines = vec![format!("╭─── {title} {}╮", "─".repeat(title_dashes))];

    for (label, value) in rows {
        // Long values (paths, error messages) wrap onto continuation rows.
        let chars: Vec<char> = value.chars().collect();
        let mut chunks = chars.chunks(value_w).map(|c| c.iter().collect::<String>());
        let first = chunks.next().unwrap_or_default();
        lines.push(format!("│ {label:<label_w$}{first:<value_w$} │"));
        for rest in chunks {
            lines.push(format!("│ {:<label_w$}{rest:<value_w$} │", ""));
        }
    }

    lines.push(format!("╰{}╯", "─".repeat(WIDTH - 2)));
    lines
}
