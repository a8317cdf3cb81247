use anyhow::Result;
use std::collections::HashSet;

use crate::Context;
use crate::schema::{JobRunState, StackConfig, TriggerKind};
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let loaded = super::load(ctx)?;
    let config = &loaded.config;

    ui::header(&format!("{} trigger chain", config.stack.name));
    println!();
    for line in render_chain(config) {
        println!("  {line}");
    }
    Ok(())
}

/// One edge out of a job: another job or the crawler
struct Step<'a> {
    label: String,
    job: Option<&'a str>,
}

fn steps_after<'a>(config: &'a StackConfig, job: &str) -> Vec<Step<'a>> {
    let mut steps: Vec<Step<'a>> = config
        .triggers
        .iter()
        .filter_map(|trigger| match &trigger.kind {
            TriggerKind::Conditional { after, state } if after == job => Some(Step {
                label: format!("{} ({}, on {state})", trigger.job, trigger.name),
                job: Some(trigger.job.as_str()),
            }),
            _ => None,
        })
        .collect();

    let catalog = &config.catalog;
    if catalog.enabled && catalog.after == job {
        steps.push(Step {
            label: format!(
                "crawler {} ({}, on {})",
                catalog.crawler,
                catalog.trigger,
                JobRunState::Succeeded
            ),
            job: None,
        });
    }
    steps
}

fn walk<'a>(
    config: &'a StackConfig,
    job: &str,
    prefix: &str,
    visited: &mut HashSet<&'a str>,
    lines: &mut Vec<String>,
) {
    let steps = steps_after(config, job);
    let count = steps.len();
    for (i, step) in steps.into_iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└─ " } else { "├─ " };
        lines.push(format!("{prefix}{branch}{}", step.label));

        let Some(next) = step.job else { continue };
        let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
        if visited.insert(next) {
            walk(config, next, &child_prefix, visited, lines);
        } else {
            lines.push(format!("{child_prefix}└─ (back to {next})"));
        }
    }
}

/// Render the trigger chain as a tree, one root per scheduled trigger
///
/// Jobs no trigger path reaches are listed after the tree.
pub fn render_chain(config: &StackConfig) -> Vec<String> {
    let mut lines = Vec::new();
    let mut visited = HashSet::new();

    for trigger in &config.triggers {
        let TriggerKind::Scheduled { schedule } = &trigger.kind else {
            continue;
        };
        lines.push(format!("{schedule} [{}]", trigger.name));
        lines.push(format!("└─ {}", trigger.job));
        if visited.insert(trigger.job.as_str()) {
            walk(config, &trigger.job, "   ", &mut visited, &mut lines);
        }
    }

    for job in &config.jobs {
        if !visited.contains(job.name.as_str()) {
            lines.push(format!("(not scheduled) {}", job.name));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{JobConfig, TriggerConfig};

    #[test]
    fn test_default_chain() {
        let lines = render_chain(&StackConfig::default());
        assert_eq!(
            lines,
            vec![
                "cron(0 11 * * ? *) [initial_trigger]",
                "└─ download_ticketmaster_data",
                "   └─ fragments_to_parquet_job (frag_trigger, on SUCCEEDED)",
                "      └─ parquet_analysis_job (analysis_trigger, on SUCCEEDED)",
            ]
        );
    }

    #[test]
    fn test_catalog_branches_after_merge() {
        let mut config = StackConfig::default();
        config.catalog.enabled = true;
        let lines = render_chain(&config);
        assert_eq!(
            lines[3],
            "      ├─ parquet_analysis_job (analysis_trigger, on SUCCEEDED)"
        );
        assert_eq!(
            lines[4],
            "      └─ crawler ticketmaster_crawler (crawler_trigger, on SUCCEEDED)"
        );
    }

    #[test]
    fn test_cycle_and_unscheduled_jobs() {
        let mut config = StackConfig::default();
        config.jobs = vec![
            JobConfig::new("a", "a.py", ""),
            JobConfig::new("b", "b.py", ""),
            JobConfig::new("orphan", "orphan.py", ""),
        ];
        let conditional = |name: &str, job: &str, after: &str| TriggerConfig {
            name: name.to_string(),
            job: job.to_string(),
            start_on_creation: true,
            kind: TriggerKind::Conditional {
                after: after.to_string(),
                state: JobRunState::Succeeded,
            },
        };
        config.triggers = vec![
            TriggerConfig {
                name: "start".to_string(),
                job: "a".to_string(),
                start_on_creation: true,
                kind: TriggerKind::Scheduled {
                    schedule: "cron(0 1 * * ? *)".to_string(),
                },
            },
            conditional("ab", "b", "a"),
            conditional("ba", "a", "b"),
        ];

        let lines = render_chain(&config);
        assert!(lines.contains(&"         └─ (back to a)".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("(not scheduled) orphan"));
    }
}
