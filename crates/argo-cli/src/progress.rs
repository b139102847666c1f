//! Console progress output for `argo build`

use colored::*;

use argo_core::{BatchProgress, IngestObserver, TableReport};

/// Prints one line per stored batch
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl IngestObserver for ConsoleObserver {
    fn batch_stored(&self, progress: &BatchProgress) {
        println!("{}", format_batch(progress).green());
    }
}

pub fn format_batch(progress: &BatchProgress) -> String {
    format!(
        "✔️ Stored batch {} ({} docs)",
        progress.batch, progress.documents
    )
}

pub fn format_table_report(report: &TableReport) -> String {
    match &report.error {
        Some(error) => format!(
            "⚠️ Skipped {} after {} rows: {}",
            report.table, report.documents, error
        ),
        None if report.truncated => format!(
            "✅ Loaded {} rows from {} (row limit reached)",
            report.documents, report.table
        ),
        None => format!("✅ Loaded {} rows from {}", report.documents, report.table),
    }
}

/// Print the per-table outcome of a mapping run
pub fn print_table_reports(reports: &[TableReport]) {
    for report in reports {
        let line = format_table_report(report);
        if report.error.is_some() {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
}
