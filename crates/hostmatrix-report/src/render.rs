//! Markdown rendering of pivot reports and report listings.
//!
//! Rendering never reorders: role-sets, spec columns and hosts appear exactly
//! in the order the engine produced them.

use std::fmt::Write;

use hostmatrix_core::{ExampleStatus, PivotReport, ResultCell};

use crate::store::ReportEntry;

/// Single-character glyph for a cell status.
#[must_use]
pub const fn status_glyph(status: ExampleStatus) -> char {
    match status {
        ExampleStatus::Passed => '.',
        ExampleStatus::Failed => 'F',
        ExampleStatus::Pending => '*',
        ExampleStatus::Missing => '-',
        ExampleStatus::Unknown => '?',
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn percent_label(percent: Option<u8>) -> String {
    percent.map_or_else(|| "n/a".to_owned(), |value| format!("{value}%"))
}

/// Render pivot reports as a self-contained Markdown document.
#[must_use]
pub fn render_pivots_markdown(title: &str, reports: &[PivotReport]) -> String {
    let mut out = String::with_capacity(4096);
    let _ = writeln!(out, "# {}\n", escape_cell(title));

    if reports.is_empty() {
        let _ = writeln!(out, "_No hosts in report._");
        return out;
    }

    for report in reports {
        render_role_set(&mut out, report);
    }
    out
}

fn render_role_set(out: &mut String, report: &PivotReport) {
    let _ = writeln!(out, "## {}\n", escape_cell(&report.name));
    let _ = writeln!(out, "- **Hosts:** {}", report.results.len());
    let _ = writeln!(out, "- **Tests:** {}", report.tests);
    let _ = writeln!(out, "- **Success rate:** {}", percent_label(report.percent));
    let role_counts: Vec<String> = report
        .roles
        .iter()
        .map(|(role, summary)| format!("{role} ({})", summary.tests))
        .collect();
    let _ = writeln!(out, "- **Roles:** {}\n", role_counts.join(", "));

    let mut header = String::from("| Host | Pass | Fail | Color |");
    let mut rule = String::from("|------|------|------|-------|");
    for spec in &report.specs {
        let _ = write!(header, " {}/{}", escape_cell(&spec.role), escape_cell(&spec.spec));
        if !spec.namespaces.is_empty() {
            let _ = write!(header, " ({})", escape_cell(&spec.namespaces.join(", ")));
        }
        header.push_str(" |");
        rule.push_str("---|");
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{rule}");

    for host in &report.results {
        let _ = write!(
            out,
            "| {} | {} | {} | {} |",
            escape_cell(&host.name),
            host.success,
            host.failure,
            host.color
        );
        let mut cells = host.cells.iter();
        for spec in &report.specs {
            let glyphs: String = cells
                .by_ref()
                .take(spec.tests)
                .map(|cell| status_glyph(cell.status))
                .collect();
            let _ = write!(out, " `{glyphs}` |");
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);

    if report.specs.is_empty() {
        let _ = writeln!(out, "_No failing specs._\n");
        return;
    }

    let _ = writeln!(out, "### Failures\n");
    for host in &report.results {
        for cell in host
            .cells
            .iter()
            .filter(|cell| cell.status == ExampleStatus::Failed)
        {
            render_failure(out, &host.name, cell);
        }
    }
}

fn render_failure(out: &mut String, host: &str, cell: &ResultCell) {
    let location = cell.example.as_ref().map_or_else(
        || match &cell.namespace {
            Some(namespace) => format!(
                "{namespace}/{}/{}:{}",
                cell.role, cell.spec, cell.line_number
            ),
            None => format!("{}/{}:{}", cell.role, cell.spec, cell.line_number),
        },
        |example| format!("{}:{}", example.file_path, example.line_number),
    );
    let _ = writeln!(
        out,
        "- **{}** `{}` {}",
        escape_cell(host),
        location,
        escape_cell(&cell.full_description)
    );
    if let Some(source) = &cell.source {
        let _ = writeln!(out, "\n  ```ruby");
        for (offset, line) in source.text.lines().enumerate() {
            let _ = writeln!(out, "  {:>4} {line}", source.start_line as usize + offset);
        }
        let _ = writeln!(out, "  ```\n");
    }
}

/// Render a report listing as a Markdown table.
#[must_use]
pub fn render_report_list(entries: &[ReportEntry]) -> String {
    let mut out = String::with_capacity(256 + entries.len() * 64);
    let _ = writeln!(out, "# Reports\n");
    if entries.is_empty() {
        let _ = writeln!(out, "_No reports found._");
        return out;
    }
    let _ = writeln!(out, "| Report | Modified (unix ms) | Size (bytes) |");
    let _ = writeln!(out, "|--------|--------------------|--------------|");
    for entry in entries {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            escape_cell(&entry.id),
            entry.modified_unix_ms,
            entry.size_bytes
        );
    }
    out
}
