//! Human-readable rendering of manifests and run reports.

use crate::analysis::{Category, Manifest};
use crate::executor::{BatchReport, TaskStatus};
use crate::theme::Theme;
use std::fmt::Write;

pub fn render_manifest(manifest: &Manifest, theme: &Theme) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        theme.header.apply(&format!("Project {}", manifest.root.display()))
    );

    for category in Category::all() {
        let files = manifest.category(*category);
        if files.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} ({})", theme.header.apply(category.as_str()), files.len());
        for file in files {
            let _ = writeln!(out, "  {}", theme.path.apply(&file.relative.display().to_string()));
        }
    }

    if !manifest.skipped.is_empty() {
        let _ = writeln!(out, "\n{} ({})", theme.warning.apply("skipped"), manifest.skipped.len());
        for skipped in &manifest.skipped {
            let _ = writeln!(
                out,
                "  {} {}",
                skipped.path.display(),
                theme.muted.apply(&format!("({})", skipped.reason))
            );
        }
    }

    let next: Vec<String> = manifest
        .dependencies
        .iter()
        .filter(|d| d.is_next_related())
        .map(|d| format!("{}@{}", d.name, d.version))
        .collect();
    if !next.is_empty() {
        let _ = writeln!(out, "\n{} {}", theme.header.apply("framework:"), next.join(", "));
    }
    out
}

pub fn render_report(report: &BatchReport, theme: &Theme, show_diffs: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", theme.header.apply("Conversion summary"));
    let _ = writeln!(
        out,
        "  {} succeeded, {} failed, {} cancelled, {} skipped, {} assets copied ({:.1}s)",
        theme.success.apply(&report.succeeded().to_string()),
        theme.failure.apply(&report.failed().to_string()),
        report.cancelled_tasks(),
        report.skipped.len(),
        report.assets_copied,
        report.duration().num_milliseconds() as f64 / 1000.0
    );

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\n{}", theme.failure.apply("Failed files"));
        for failure in &report.failures {
            let _ = writeln!(
                out,
                "  {}: {}",
                theme.path.apply(&failure.path.display().to_string()),
                failure.reason
            );
            if let (true, Some(diff)) = (show_diffs, failure.diff.as_deref()) {
                for line in diff.lines() {
                    let _ = writeln!(out, "    {}", theme.diff_line(line));
                }
            }
        }
    }

    if let Some(error) = &report.asset_error {
        let _ = writeln!(out, "\n{} {}", theme.failure.apply("Asset copy failed:"), error);
    }

    if report.cancelled {
        let _ = writeln!(out, "\n{}", theme.warning.apply("Cancelled. Completed before stopping:"));
        for task in report.tasks.iter().filter(|t| t.status == TaskStatus::Succeeded) {
            let _ = writeln!(out, "  {}", task.relative().display());
        }
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\n{}", theme.muted.apply("Not converted:"));
        for skipped in &report.skipped {
            let _ = writeln!(out, "  {} ({})", skipped.path.display(), skipped.reason);
        }
    }
    out
}
