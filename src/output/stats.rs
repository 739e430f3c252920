//! Console rendering of run statistics

use crate::output::report::ScrapeReport;
use crate::state::PageOutcome;

/// Formats a run report for the terminal
pub fn format_report(report: &ScrapeReport) -> String {
    let mut out = String::new();

    out.push_str("=== Scrape Statistics ===\n\n");

    out.push_str("Pages:\n");
    out.push_str(&format!("  Requested: {}\n", report.pages_requested));
    for outcome in [
        PageOutcome::Scraped,
        PageOutcome::Empty,
        PageOutcome::NotFound,
        PageOutcome::FetchFailed,
    ] {
        let count = report.pages_with(outcome);
        if count > 0 {
            out.push_str(&format!("  {}: {}\n", outcome, count));
        }
    }
    if report.stopped_early {
        out.push_str("  Stopped at page ceiling before the listing ended\n");
    }
    out.push('\n');

    out.push_str("Records:\n");
    out.push_str(&format!("  Candidates found: {}\n", report.candidates_found));
    out.push_str(&format!("  New or changed: {}\n", report.records_emitted));
    out.push_str(&format!("  Unchanged: {}\n", report.records_unchanged));
    out.push_str(&format!("  Items skipped: {}\n", report.items_skipped));
    out.push_str(&format!("  Image failures: {}\n", report.asset_failures));
    out.push('\n');

    if !report.failed_pages.is_empty() {
        out.push_str(&format!("Failed Pages ({}):\n", report.failure_summary()));
        for failure in &report.failed_pages {
            out.push_str(&format!("  - page {}: {}\n", failure.page, failure.reason));
        }
        out.push('\n');
    }

    if let Some(duration) = report.duration() {
        out.push_str(&format!(
            "Duration: {:.2}s\n",
            duration.num_milliseconds() as f64 / 1000.0
        ));
    }

    out.push_str(&format!(
        "Success Rate: {:.1}% ({})\n",
        report.success_rate(),
        report.failure_summary()
    ));

    out
}

/// Prints a run report to stdout
pub fn print_report(report: &ScrapeReport) {
    print!("{}", format_report(report));
}
