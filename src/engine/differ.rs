//! Diff display for templates

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, group_by_type};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

/// Display a list of diffs grouped by resource type
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No differences", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Template Diff".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        println!("│ {}", resource_type.bold());

        for diff in type_diffs {
            let symbol = if diff.is_addition() {
                "+".green()
            } else if diff.is_removal() {
                "-".red()
            } else {
                "~".yellow()
            };

            let detail = if diff.is_replacement() {
                "(type changed, replaced)".red().to_string()
            } else if diff.is_modification() {
                diff.changed.join(", ").dimmed().to_string()
            } else {
                String::new()
            };

            println!("│   {} {:<40} {}", symbol, diff.logical_id, detail);

            if diff.is_modification()
                && let (Some(before), Some(after)) = (&diff.before, &diff.after)
            {
                for line in property_diff(before, after) {
                    println!("│       {line}");
                }
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} added, {} removed, {} modified)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.removals.to_string().red(),
        summary.modifications.to_string().yellow()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Changed lines between two pretty-printed documents, colored
pub fn property_diff(before: &Value, after: &Value) -> Vec<String> {
    let old = serde_json::to_string_pretty(before).unwrap_or_default();
    let new = serde_json::to_string_pretty(after).unwrap_or_default();
    TextDiff::from_lines(&old, &new)
        .iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end_matches('\n');
            match change.tag() {
                ChangeTag::Delete => Some(format!("- {line}").red().to_string()),
                ChangeTag::Insert => Some(format!("+ {line}").green().to_string()),
                ChangeTag::Equal => None,
            }
        })
        .collect()
}
