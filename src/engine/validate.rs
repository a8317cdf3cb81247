//! Structural checks and lints over a synthesized template
//!
//! Validation reads only the template, so a document loaded from disk is
//! checked exactly like a fresh synthesis.

use declarative::{RemovalPolicy, Template, TemplateResource, intrinsic};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::LazyLock;

use crate::resource::job::parse_script_location;
use crate::resource::types;

static CRON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^cron\((.+)\)$").expect("valid regex"));

static CRON_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z*?,/#-]+$").expect("valid regex"));

const SUCCEEDED: &str = "SUCCEEDED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// One problem found in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// Short stable identifier, e.g. `trigger-fan-out`
    pub code: &'static str,
    /// Logical ID the finding is about, if any
    pub resource: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub findings: Vec<Finding>,
}

impl Report {
    fn error(&mut self, code: &'static str, resource: Option<&str>, message: String) {
        self.push(Severity::Error, code, resource, message);
    }

    fn warn(&mut self, code: &'static str, resource: Option<&str>, message: String) {
        self.push(Severity::Warning, code, resource, message);
    }

    fn push(&mut self, severity: Severity, code: &'static str, resource: Option<&str>, message: String) {
        self.findings.push(Finding {
            severity,
            code,
            resource: resource.map(ToString::to_string),
            message,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Whether the template is acceptable; strict mode also rejects warnings
    pub fn passes(&self, strict: bool) -> bool {
        if strict {
            self.findings.is_empty()
        } else {
            !self.has_errors()
        }
    }

    #[cfg(test)]
    pub fn has_code(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }
}

/// A trigger as read back from the template
#[derive(Debug)]
struct TriggerView<'t> {
    logical_id: &'t str,
    name: &'t str,
    kind: &'t str,
    schedule: Option<&'t str>,
    /// Job names started by this trigger
    jobs: Vec<&'t str>,
    /// (job, operator, state) conditions
    conditions: Vec<(&'t str, &'t str, &'t str)>,
    workflow: Option<&'t Value>,
}

impl<'t> TriggerView<'t> {
    fn read(logical_id: &'t str, resource: &'t TemplateResource) -> Self {
        let actions = resource
            .property("Actions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let conditions = resource
            .property("Predicate")
            .and_then(|p| p.get("Conditions"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Self {
            logical_id,
            name: resource.str_property("Name").unwrap_or(logical_id),
            kind: resource.str_property("Type").unwrap_or_default(),
            schedule: resource.str_property("Schedule"),
            jobs: actions
                .iter()
                .filter_map(|a| a.get("JobName").and_then(Value::as_str))
                .collect(),
            conditions: conditions
                .iter()
                .map(|c| {
                    let field = |key: &str| c.get(key).and_then(Value::as_str).unwrap_or_default();
                    (field("JobName"), field("LogicalOperator"), field("State"))
                })
                .collect(),
            workflow: resource.property("WorkflowName"),
        }
    }

    /// Upstream job when this trigger starts a job on another's success
    fn success_edge(&self) -> Option<(&'t str, &'t str)> {
        match (self.conditions.as_slice(), self.jobs.as_slice()) {
            ([(upstream, _, SUCCEEDED)], [job]) => Some((*upstream, *job)),
            _ => None,
        }
    }
}

/// Run every check against a template
pub fn validate(template: &Template) -> Report {
    let mut report = Report::default();

    let jobs: BTreeMap<&str, &str> = template
        .resources_of_type(types::JOB)
        .map(|(id, job)| (job.str_property("Name").unwrap_or(id.as_str()), id.as_str()))
        .collect();
    let triggers: Vec<TriggerView<'_>> = template
        .resources_of_type(types::TRIGGER)
        .map(|(id, t)| TriggerView::read(id, t))
        .collect();

    let script_buckets = check_scripts(template, &mut report);
    check_job_triggers(&jobs, &triggers, &mut report);
    check_schedule(&triggers, &mut report);
    check_conditions(&jobs, &triggers, &mut report);
    check_chain(&jobs, &triggers, &mut report);
    check_workflow(&triggers, &mut report);
    check_secrets(template, &mut report);
    check_buckets(template, &script_buckets, &mut report);
    check_failure_paths(&jobs, &triggers, &mut report);

    if template.count_of_type(types::CRAWLER) == 0 {
        report.warn(
            "catalog-disabled",
            None,
            "No crawler is declared; processed data is not cataloged".to_string(),
        );
    }

    log::debug!(
        "Validation found {} error(s), {} warning(s)",
        report.errors().count(),
        report.warnings().count()
    );
    report
}

/// Scripts share one bucket and prefix and never collide; returns the buckets
///
/// The prefix of a key is the deployed prefix it lies under, so scripts in
/// subdirectories of that prefix still count as one prefix. Without a
/// deployment, the first path segment stands in for it.
fn check_scripts(template: &Template, report: &mut Report) -> BTreeSet<String> {
    let deployed: BTreeSet<&str> = template
        .resources_of_type(types::BUCKET_DEPLOYMENT)
        .filter_map(|(_, d)| d.str_property("DestinationBucketKeyPrefix"))
        .collect();
    let mut buckets = BTreeSet::new();
    let mut prefixes = BTreeSet::new();
    let mut keys: HashMap<&str, &str> = HashMap::new();

    for (id, job) in template.resources_of_type(types::JOB) {
        let location = job.property("Command").and_then(|c| c.get("ScriptLocation"));
        let Some((bucket, key)) = location.and_then(parse_script_location) else {
            report.error(
                "script-location",
                Some(id.as_str()),
                "Script location is not s3://<bucket reference>/<key>".to_string(),
            );
            continue;
        };
        buckets.insert(bucket.to_string());
        let prefix = key_prefix(key, &deployed);
        if !deployed.is_empty() && !deployed.contains(prefix) {
            report.error(
                "script-prefix",
                Some(id.as_str()),
                format!("Script '{key}' is outside the deployed asset prefix"),
            );
        }
        prefixes.insert(prefix);
        if let Some(other) = keys.insert(key, id.as_str()) {
            report.error(
                "script-shared",
                Some(id.as_str()),
                format!("Script '{key}' is also run by {other}"),
            );
        }
    }

    if buckets.len() > 1 || prefixes.len() > 1 {
        report.error(
            "script-spread",
            None,
            format!(
                "Job scripts span {} bucket(s) and {} prefix(es); expected one of each",
                buckets.len(),
                prefixes.len()
            ),
        );
    }
    buckets
}

fn key_prefix<'t>(key: &'t str, deployed: &BTreeSet<&'t str>) -> &'t str {
    deployed
        .iter()
        .copied()
        .filter(|prefix| key.starts_with(prefix))
        .max_by_key(|prefix| prefix.len())
        .unwrap_or_else(|| key.find('/').map_or("", |end| &key[..=end]))
}

fn check_job_triggers(jobs: &BTreeMap<&str, &str>, triggers: &[TriggerView<'_>], report: &mut Report) {
    for (name, id) in jobs {
        let starters = triggers.iter().filter(|t| t.jobs.contains(name)).count();
        if starters != 1 {
            report.error(
                "job-trigger-count",
                Some(*id),
                format!("Job '{name}' is started by {starters} trigger(s); expected exactly one"),
            );
        }
    }
}

fn check_schedule(triggers: &[TriggerView<'_>], report: &mut Report) {
    let scheduled: Vec<_> = triggers.iter().filter(|t| t.kind == "SCHEDULED").collect();
    if scheduled.len() != 1 {
        report.error(
            "schedule-count",
            None,
            format!("{} scheduled trigger(s); expected exactly one", scheduled.len()),
        );
    }
    for trigger in scheduled {
        match trigger.schedule {
            Some(expr) => {
                if let Err(reason) = check_cron(expr) {
                    report.error(
                        "schedule-cron",
                        Some(trigger.logical_id),
                        format!("Trigger '{}' schedule '{expr}': {reason}", trigger.name),
                    );
                }
            }
            None => report.error(
                "schedule-cron",
                Some(trigger.logical_id),
                format!("Scheduled trigger '{}' has no schedule", trigger.name),
            ),
        }
    }
}

/// Check a six-field `cron(...)` expression
pub fn check_cron(expr: &str) -> Result<(), String> {
    let inner = CRON
        .captures(expr)
        .and_then(|c| c.get(1))
        .ok_or_else(|| "expected cron(...)".to_string())?;
    let fields: Vec<&str> = inner.as_str().split_whitespace().collect();
    if fields.len() != 6 {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    }

    // minutes, hours, day-of-month, month, day-of-week, year
    let ranges = [(0, 59), (0, 23), (1, 31), (1, 12), (1, 7), (1970, 2199)];
    for (field, (low, high)) in fields.iter().zip(ranges) {
        if !CRON_FIELD.is_match(field) {
            return Err(format!("invalid field '{field}'"));
        }
        if let Ok(value) = field.parse::<u32>()
            && !(low..=high).contains(&value)
        {
            return Err(format!("'{value}' is outside {low}-{high}"));
        }
    }

    match (fields[2] == "?", fields[4] == "?") {
        (true, false) | (false, true) => Ok(()),
        _ => Err("exactly one of day-of-month and day-of-week must be '?'".to_string()),
    }
}

fn check_conditions(jobs: &BTreeMap<&str, &str>, triggers: &[TriggerView<'_>], report: &mut Report) {
    for trigger in triggers.iter().filter(|t| t.kind == "CONDITIONAL") {
        if trigger.conditions.len() != 1 {
            report.error(
                "condition-count",
                Some(trigger.logical_id),
                format!(
                    "Trigger '{}' has {} conditions; expected exactly one",
                    trigger.name,
                    trigger.conditions.len()
                ),
            );
        }
        for (job, operator, _) in &trigger.conditions {
            if *operator != "EQUALS" {
                report.error(
                    "condition-operator",
                    Some(trigger.logical_id),
                    format!("Trigger '{}' uses operator '{operator}'", trigger.name),
                );
            }
            if !jobs.contains_key(job) {
                report.error(
                    "condition-job",
                    Some(trigger.logical_id),
                    format!("Trigger '{}' waits on undeclared job '{job}'", trigger.name),
                );
            }
        }
    }
}

/// Success-gated triggers form one line from the scheduled job
fn check_chain(jobs: &BTreeMap<&str, &str>, triggers: &[TriggerView<'_>], report: &mut Report) {
    let mut next: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (upstream, job) in triggers.iter().filter_map(TriggerView::success_edge) {
        next.entry(upstream).or_default().push(job);
    }

    for (upstream, downstream) in &next {
        if downstream.len() > 1 {
            report.error(
                "trigger-fan-out",
                jobs.get(upstream).copied(),
                format!("Job '{upstream}' starts {} jobs on success: {}", downstream.len(), downstream.join(", ")),
            );
        }
    }

    // Kahn over success edges; anything left over sits on a cycle
    let mut indegree: BTreeMap<&str, usize> = jobs.keys().map(|j| (*j, 0)).collect();
    for downstream in next.values() {
        for job in downstream {
            *indegree.entry(*job).or_insert(0) += 1;
        }
    }
    let mut queue: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(j, _)| *j)
        .collect();
    let mut seen = 0;
    while let Some(job) = queue.pop_front() {
        seen += 1;
        for downstream in next.get(job).into_iter().flatten() {
            if let Some(d) = indegree.get_mut(downstream) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(*downstream);
                }
            }
        }
    }
    if seen < indegree.len() {
        let cycle: Vec<&str> = indegree
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(j, _)| *j)
            .collect();
        report.error(
            "trigger-cycle",
            None,
            format!("Jobs wait on each other in a cycle: {}", cycle.join(", ")),
        );
    }

    // Reachability follows every trigger, including failure paths
    let mut any_next: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for trigger in triggers {
        for (upstream, _, _) in &trigger.conditions {
            any_next.entry(*upstream).or_default().extend(&trigger.jobs);
        }
    }
    let mut reached: BTreeSet<&str> = triggers
        .iter()
        .filter(|t| t.kind == "SCHEDULED")
        .flat_map(|t| t.jobs.iter().copied())
        .collect();
    let mut queue: VecDeque<&str> = reached.iter().copied().collect();
    while let Some(job) = queue.pop_front() {
        for downstream in any_next.get(job).into_iter().flatten() {
            if reached.insert(*downstream) {
                queue.push_back(*downstream);
            }
        }
    }
    for (name, id) in jobs {
        if !reached.contains(name) {
            report.error(
                "job-unreachable",
                Some(*id),
                format!("Job '{name}' is never reached from the scheduled trigger"),
            );
        }
    }
}

fn check_workflow(triggers: &[TriggerView<'_>], report: &mut Report) {
    let mut workflows = BTreeSet::new();
    for trigger in triggers {
        match trigger.workflow {
            Some(workflow) => {
                workflows.insert(workflow.to_string());
            }
            None => report.error(
                "trigger-workflow",
                Some(trigger.logical_id),
                format!("Trigger '{}' is not part of a workflow", trigger.name),
            ),
        }
    }
    if workflows.len() > 1 {
        report.error(
            "trigger-workflow",
            None,
            format!("Triggers span {} workflows; expected one", workflows.len()),
        );
    }
}

fn check_secrets(template: &Template, report: &mut Report) {
    for (id, policy) in template.resources_of_type(types::POLICY) {
        let statements = policy
            .property("PolicyDocument")
            .and_then(|d| d.get("Statement"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for statement in statements {
            let grants_secret = as_list(statement.get("Action"))
                .iter()
                .any(|a| a.as_str().is_some_and(|a| a.starts_with("secretsmanager:")));
            if !grants_secret {
                continue;
            }
            match as_list(statement.get("Resource")).as_slice() {
                [Value::String(arn)] if !arn.contains('*') => report.warn(
                    "secret-literal-arn",
                    Some(id.as_str()),
                    format!("Secret access is bound to the literal ARN {arn}; renaming the secret breaks jobs at run time"),
                ),
                [single] if !single.is_string() && !intrinsic::render(single).contains('*') => {}
                resources => report.error(
                    "secret-scope",
                    Some(id.as_str()),
                    format!(
                        "Secret access must name exactly one secret without wildcards, found {}",
                        resources
                            .iter()
                            .map(intrinsic::render)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ),
            }
        }
    }
}

fn as_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    }
}

fn check_buckets(template: &Template, script_buckets: &BTreeSet<String>, report: &mut Report) {
    let auto_deleted: BTreeSet<&str> = template
        .resources_of_type(types::AUTO_DELETE_OBJECTS)
        .filter_map(|(_, r)| r.property("BucketName").and_then(intrinsic::as_reference))
        .collect();

    for (id, bucket) in template.resources_of_type(types::BUCKET) {
        let public = is_public(template, id);
        if public && script_buckets.contains(id) {
            report.error(
                "public-scripts",
                Some(id.as_str()),
                "Bucket holding job scripts is publicly readable".to_string(),
            );
        } else if public {
            report.warn(
                "public-bucket",
                Some(id.as_str()),
                "Bucket objects are readable by anyone".to_string(),
            );
        }
        if auto_deleted.contains(id.as_str()) && bucket.removal_policy() != Some(RemovalPolicy::Destroy) {
            report.error(
                "auto-delete-retained",
                Some(id.as_str()),
                "Bucket is kept on teardown but its contents are deleted first".to_string(),
            );
        } else if auto_deleted.contains(id.as_str()) {
            report.warn(
                "auto-delete",
                Some(id.as_str()),
                "Bucket contents are deleted when the stack is torn down".to_string(),
            );
        }
    }
}

/// A bucket is public if a policy grants to everyone and nothing blocks it
fn is_public(template: &Template, bucket: &str) -> bool {
    let blocks_policy = template
        .resources
        .get(bucket)
        .and_then(|b| b.property("PublicAccessBlockConfiguration"))
        .is_some_and(|c| {
            c.get("BlockPublicPolicy") == Some(&Value::Bool(true))
                || c.get("RestrictPublicBuckets") == Some(&Value::Bool(true))
        });
    if blocks_policy {
        return false;
    }

    template
        .resources_of_type(types::BUCKET_POLICY)
        .filter(|(_, p)| p.property("Bucket").and_then(intrinsic::as_reference) == Some(bucket))
        .flat_map(|(_, p)| {
            p.property("PolicyDocument")
                .and_then(|d| d.get("Statement"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        })
        .any(|statement| {
            let allow = statement.get("Effect").and_then(Value::as_str) == Some("Allow");
            let everyone = match statement.get("Principal") {
                Some(Value::String(p)) => p == "*",
                Some(principal) => principal.get("AWS").and_then(Value::as_str) == Some("*"),
                None => false,
            };
            allow && everyone
        })
}

fn check_failure_paths(jobs: &BTreeMap<&str, &str>, triggers: &[TriggerView<'_>], report: &mut Report) {
    for (name, id) in jobs {
        let handled = triggers.iter().any(|t| {
            t.conditions
                .iter()
                .any(|(job, _, state)| job == name && *state != SUCCEEDED)
        });
        if !handled {
            report.warn(
                "no-failure-path",
                Some(*id),
                format!("Nothing reacts when job '{name}' fails; the pipeline halts silently"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StagedAsset;
    use crate::engine::build_stack;
    use crate::schema::{BucketAccess, JobConfig, JobRunState, StackConfig, TriggerConfig, TriggerKind};
    use serde_json::json;
    use std::path::PathBuf;

    fn synth(config: &StackConfig) -> Template {
        let assets: Vec<StagedAsset> = config
            .jobs
            .iter()
            .map(|job| StagedAsset {
                relative: job.script.clone(),
                source: PathBuf::from(&job.script),
                hash: "0".repeat(64),
                size: 0,
            })
            .collect();
        let graph = build_stack(config, &assets).unwrap();
        Template::synthesize(&graph, None).unwrap()
    }

    fn conditional(name: &str, job: &str, after: &str, state: JobRunState) -> TriggerConfig {
        TriggerConfig {
            name: name.to_string(),
            job: job.to_string(),
            start_on_creation: true,
            kind: TriggerKind::Conditional {
                after: after.to_string(),
                state,
            },
        }
    }

    #[test]
    fn test_default_stack_has_no_errors() {
        let report = validate(&synth(&StackConfig::default()));
        let errors: Vec<_> = report.errors().collect();
        assert!(errors.is_empty(), "{errors:?}");
        assert!(report.passes(false));
        assert!(!report.passes(true));

        for code in ["public-bucket", "auto-delete", "secret-literal-arn", "no-failure-path", "catalog-disabled"] {
            assert!(report.has_code(code), "missing {code}");
        }
        assert_eq!(report.findings.iter().filter(|f| f.code == "no-failure-path").count(), 3);
    }

    #[test]
    fn test_fan_out_is_rejected() {
        let mut config = StackConfig::default();
        config.triggers[2] = conditional(
            "analysis_trigger",
            "parquet_analysis_job",
            "download_ticketmaster_data",
            JobRunState::Succeeded,
        );
        let report = validate(&synth(&config));
        assert!(report.has_code("trigger-fan-out"));
    }

    #[test]
    fn test_failure_path_is_not_fan_out() {
        let mut config = StackConfig::default();
        config.jobs.push(JobConfig::new("notify_failure", "notify.py", ""));
        config.triggers.push(conditional(
            "download_failed",
            "notify_failure",
            "download_ticketmaster_data",
            JobRunState::Failed,
        ));
        let report = validate(&synth(&config));
        assert!(!report.has_code("trigger-fan-out"));
        assert!(!report.has_code("job-unreachable"));
        assert!(report.passes(false), "{:?}", report.findings);
        assert_eq!(report.findings.iter().filter(|f| f.code == "no-failure-path").count(), 3);
    }

    #[test]
    fn test_malformed_cron() {
        assert!(check_cron("cron(0 11 * * ? *)").is_ok());
        assert!(check_cron("cron(0/15 * ? * MON-FRI *)").is_ok());
        assert!(check_cron("cron(0 11 * * *)").is_err());
        assert!(check_cron("cron(0 11 * * * *)").is_err());
        assert!(check_cron("cron(0 25 * * ? *)").is_err());
        assert!(check_cron("rate(1 day)").is_err());

        let mut config = StackConfig::default();
        config.triggers[0].kind = TriggerKind::Scheduled {
            schedule: "0 11 * * ? *".to_string(),
        };
        assert!(validate(&synth(&config)).has_code("schedule-cron"));
    }

    #[test]
    fn test_multi_condition_trigger() {
        let mut template = synth(&StackConfig::default());
        let id = template
            .resources_of_type(types::TRIGGER)
            .find(|(_, t)| t.str_property("Name") == Some("analysis_trigger"))
            .map(|(id, _)| id.clone())
            .unwrap();
        let trigger = template.resources.get_mut(&id).unwrap();
        trigger.properties["Predicate"]["Conditions"]
            .as_array_mut()
            .unwrap()
            .push(json!({
                "JobName": "download_ticketmaster_data",
                "LogicalOperator": "EQUALS",
                "State": "SUCCEEDED",
            }));
        assert!(validate(&template).has_code("condition-count"));
    }

    #[test]
    fn test_wildcard_secret_scope() {
        let mut template = synth(&StackConfig::default());
        let id = template
            .resources_of_type(types::POLICY)
            .next()
            .map(|(id, _)| id.clone())
            .unwrap();
        let policy = template.resources.get_mut(&id).unwrap();
        let statements = policy.properties["PolicyDocument"]["Statement"]
            .as_array_mut()
            .unwrap();
        let last = statements.last_mut().unwrap();
        last["Resource"] = json!("arn:aws:secretsmanager:us-west-2:1:secret:*");
        let report = validate(&template);
        assert!(report.has_code("secret-scope"));
        assert!(!report.has_code("secret-literal-arn"));
    }

    fn with_secret_resource(resource: Value) -> Template {
        let mut template = synth(&StackConfig::default());
        let id = template
            .resources_of_type(types::POLICY)
            .next()
            .map(|(id, _)| id.clone())
            .unwrap();
        let policy = template.resources.get_mut(&id).unwrap();
        let statements = policy.properties["PolicyDocument"]["Statement"]
            .as_array_mut()
            .unwrap();
        statements.last_mut().unwrap()["Resource"] = resource;
        template
    }

    #[test]
    fn test_assembled_wildcard_secret_scope() {
        let template = with_secret_resource(json!({
            "Fn::Join": ["", [
                "arn:aws:secretsmanager:us-west-2:",
                { "Ref": "AWS::AccountId" },
                ":secret:*",
            ]]
        }));
        assert!(validate(&template).has_code("secret-scope"));

        let template = with_secret_resource(json!({
            "Fn::Join": ["", [
                "arn:aws:secretsmanager:us-west-2:",
                { "Ref": "AWS::AccountId" },
                ":secret:events-AbCdEf",
            ]]
        }));
        let report = validate(&template);
        assert!(!report.has_code("secret-scope"));
        assert!(!report.has_code("secret-literal-arn"));
    }

    #[test]
    fn test_script_in_subdirectory_of_prefix() {
        let mut config = StackConfig::default();
        config.jobs[2].script = "analysis/V2TicketMasterAnalysis_Final.py".to_string();
        let report = validate(&synth(&config));
        let errors: Vec<_> = report.errors().collect();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_script_outside_deployed_prefix() {
        let mut template = synth(&StackConfig::default());
        let (id, deployment) = template
            .resources
            .iter_mut()
            .find(|(_, r)| r.resource_type == types::BUCKET_DEPLOYMENT)
            .unwrap();
        let id = id.clone();
        deployment
            .properties
            .insert("DestinationBucketKeyPrefix".into(), json!("scripts/"));
        let report = validate(&template);
        assert!(report.has_code("script-prefix"), "{id}: {:?}", report.findings);
    }

    #[test]
    fn test_retained_bucket_with_auto_delete() {
        let mut template = synth(&StackConfig::default());
        let id = template
            .resources_of_type(types::AUTO_DELETE_OBJECTS)
            .next()
            .and_then(|(_, r)| r.property("BucketName").and_then(intrinsic::as_reference))
            .map(ToString::to_string)
            .unwrap();
        let bucket = template.resources.get_mut(&id).unwrap();
        bucket.deletion_policy = Some("Retain".to_string());
        bucket.update_replace_policy = Some("Retain".to_string());
        assert!(validate(&template).has_code("auto-delete-retained"));
        assert!(!validate(&synth(&StackConfig::default())).has_code("auto-delete-retained"));
    }

    #[test]
    fn test_public_scripts_bucket() {
        let mut config = StackConfig::default();
        config.buckets.scripts.access = BucketAccess::PublicRead;
        let report = validate(&synth(&config));
        assert!(report.has_code("public-scripts"));
    }

    #[test]
    fn test_self_wait_is_cycle_and_unreachable() {
        // the builder refuses self-waits, so edit the template instead
        let mut template = synth(&StackConfig::default());
        let id = template
            .resources_of_type(types::TRIGGER)
            .find(|(_, t)| t.str_property("Name") == Some("analysis_trigger"))
            .map(|(id, _)| id.clone())
            .unwrap();
        let trigger = template.resources.get_mut(&id).unwrap();
        trigger.properties["Predicate"]["Conditions"][0]["JobName"] = json!("parquet_analysis_job");
        let report = validate(&template);
        assert!(report.has_code("trigger-cycle"));
        assert!(report.has_code("job-unreachable"));
    }

    #[test]
    fn test_catalog_enabled_clears_lint() {
        let mut config = StackConfig::default();
        config.catalog.enabled = true;
        let report = validate(&synth(&config));
        assert!(!report.has_code("catalog-disabled"));
        assert!(report.passes(false), "{:?}", report.findings);
    }
}
