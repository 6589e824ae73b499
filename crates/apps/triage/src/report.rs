//! Console rendering of run results

use mail::classify::RunSummary;
use mail::gmail::api::GmailLabel;
use mail::models::{Category, LABEL_PREFIX};

/// Longest sender/subject preview shown per line
const PREVIEW_CHARS: usize = 60;

/// Print per-message results
///
/// Errors are always shown; successful classifications only with
/// `verbose`, except requires_action which is always worth a line.
pub fn print_outcomes(summary: &RunSummary, verbose: bool) {
    for outcome in &summary.outcomes {
        match &outcome.result {
            Err(e) => {
                println!("x {}", preview(&outcome.from));
                println!("  {}", preview(&outcome.subject));
                println!("  error: {}", e);
            }
            Ok(category) => {
                if verbose || *category == Category::RequiresAction {
                    println!("* {:<16} {}", category.short_name(), preview(&outcome.from));
                    println!("  {}", preview(&outcome.subject));
                }
            }
        }
    }
}

/// Print the end-of-run summary table
pub fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!();
    println!("Classification Summary");
    println!("{:<30} {:>8}", "Label", "Count");
    println!("{}", "=".repeat(39));

    for category in Category::ALL {
        if let Some(count) = summary.counts.get(&category) {
            println!("{:<30} {:>8}", category.short_name(), count);
        }
    }

    if summary.errors > 0 {
        println!("{:<30} {:>8}", "errors", summary.errors);
    }

    println!("{}", "-".repeat(39));
    println!("{:<30} {:>8}", "Total classified", summary.classified());
    println!("{:<30} {:>8}", "Already classified (skipped)", summary.skipped);
    println!("{:<30} {:>8}", "Total scanned", summary.scanned);

    if dry_run {
        println!("{:<30} {:>8}", "Mode", "DRY RUN");
    }
}

/// Print the mailbox's labels, classification labels first
pub fn print_labels(labels: &[GmailLabel]) {
    if labels.is_empty() {
        println!("No labels found.");
        return;
    }

    let mut sorted: Vec<&GmailLabel> = labels.iter().collect();
    sorted.sort_by(|a, b| {
        let a_ours = a.name.starts_with(LABEL_PREFIX);
        let b_ours = b.name.starts_with(LABEL_PREFIX);
        match (a_ours, b_ours) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.cmp(&b.name),
        }
    });

    println!("Found {} label(s):\n", sorted.len());
    println!("{:<40} {:<24} {:<10}", "Label Name", "Label ID", "Type");
    println!("{}", "=".repeat(76));

    for label in sorted {
        println!(
            "{:<40} {:<24} {:<10}",
            label.name,
            label.id,
            label.label_type.as_deref().unwrap_or("-")
        );
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() <= PREVIEW_CHARS {
        return s.to_string();
    }
    let cut: String = s.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
