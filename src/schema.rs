use anyhow::{Context, Result, bail};
use declarative::RemovalPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

/// Stack names: a letter, then letters, digits and hyphens
static STACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("valid regex"));

/// Glue job, trigger, workflow, database and crawler names
static GLUE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,255}$").expect("valid regex"));

/// Construct ids become logical IDs; keep them to path-safe characters
static CONSTRUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid regex"));

// ============================================================================
// Main Config Schema
// ============================================================================

/// The complete stack declaration
///
/// Every section has defaults, so an empty file (or no file at all)
/// declares the daily Ticketmaster pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(default)]
    pub stack: StackSettings,

    /// Execution role assumed by the jobs
    #[serde(default)]
    pub role: RoleConfig,

    #[serde(default)]
    pub buckets: BucketsConfig,

    /// Script assets uploaded into the scripts bucket
    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Job definitions, in pipeline order
    #[serde(default = "default_jobs")]
    pub jobs: Vec<JobConfig>,

    /// Triggers binding jobs to a schedule or to an upstream job's state
    #[serde(default = "default_triggers")]
    pub triggers: Vec<TriggerConfig>,

    /// Schema discovery over processed data (off unless enabled)
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack: StackSettings::default(),
            role: RoleConfig::default(),
            buckets: BucketsConfig::default(),
            assets: AssetsConfig::default(),
            workflow: WorkflowConfig::default(),
            jobs: default_jobs(),
            triggers: default_triggers(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl StackConfig {
    /// Validate the declaration before building anything from it
    pub fn validate(&self) -> Result<()> {
        if !STACK_NAME.is_match(&self.stack.name) {
            bail!(
                "Invalid stack name '{}': must start with a letter and contain only letters, digits and hyphens",
                self.stack.name
            );
        }

        let construct_ids = [
            ("role", self.role.id.as_str()),
            ("bucket", self.buckets.data.id.as_str()),
            ("bucket", self.buckets.scripts.id.as_str()),
            ("asset deployment", self.assets.id.as_str()),
            ("workflow", self.workflow.id.as_str()),
        ];
        // Every resource's construct id shares one namespace, whatever its kind
        let mut seen = HashMap::new();
        for (kind, id) in construct_ids {
            if !CONSTRUCT_ID.is_match(id) {
                bail!("Invalid construct id '{id}'");
            }
            claim_construct_id(&mut seen, kind, id)?;
        }

        self.role.validate().context("Invalid role")?;
        self.buckets
            .data
            .validate()
            .context("Invalid data bucket")?;
        self.buckets
            .scripts
            .validate()
            .context("Invalid scripts bucket")?;
        self.assets.validate().context("Invalid assets")?;
        check_glue_name("workflow", &self.workflow.name)?;

        if self.jobs.is_empty() {
            bail!("At least one job must be declared");
        }
        let mut job_names = HashSet::new();
        for job in &self.jobs {
            job.validate()
                .with_context(|| format!("Invalid job '{}'", job.name))?;
            if !job_names.insert(job.name.as_str()) {
                bail!("Duplicate job name '{}'", job.name);
            }
            claim_construct_id(&mut seen, "job", &job.name)?;
        }

        let mut trigger_names = HashSet::new();
        for trigger in &self.triggers {
            check_glue_name("trigger", &trigger.name)?;
            if !trigger_names.insert(trigger.name.as_str()) {
                bail!("Duplicate trigger name '{}'", trigger.name);
            }
            claim_construct_id(&mut seen, "trigger", &trigger.name)?;
            if let TriggerKind::Conditional { after, .. } = &trigger.kind
                && after == &trigger.job
            {
                bail!("Trigger '{}' makes job '{}' wait on itself", trigger.name, after);
            }
        }

        if self.catalog.enabled {
            self.catalog.validate().context("Invalid catalog")?;
            if trigger_names.contains(self.catalog.trigger.as_str()) {
                bail!("Duplicate trigger name '{}'", self.catalog.trigger);
            }
            claim_construct_id(&mut seen, "database", &self.catalog.database)?;
            claim_construct_id(&mut seen, "crawler", &self.catalog.crawler)?;
            claim_construct_id(&mut seen, "trigger", &self.catalog.trigger)?;
        }

        Ok(())
    }
}

/// Record `id` for `kind`; two resources with one id would get one logical ID
fn claim_construct_id<'a>(
    seen: &mut HashMap<&'a str, &'static str>,
    kind: &'static str,
    id: &'a str,
) -> Result<()> {
    if let Some(previous) = seen.insert(id, kind) {
        bail!("Construct id '{id}' is used by both a {previous} and a {kind}; rename one of them");
    }
    Ok(())
}

fn check_glue_name(kind: &str, name: &str) -> Result<()> {
    if !GLUE_NAME.is_match(name) {
        bail!("Invalid {kind} name '{name}': use letters, digits, '_', '-' or '.'");
    }
    Ok(())
}

// ============================================================================
// Stack
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSettings {
    /// Stack name; also names the synthesized template file
    #[serde(default = "default_stack_name")]
    pub name: String,

    #[serde(default = "default_stack_description")]
    pub description: String,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            name: default_stack_name(),
            description: default_stack_description(),
        }
    }
}

fn default_stack_name() -> String {
    "FinalCloudProjectV2Stack".to_string()
}

fn default_stack_description() -> String {
    "Daily Ticketmaster ingestion, merge and analysis pipeline".to_string()
}

// ============================================================================
// Role
// ============================================================================

/// The execution role and what it may do beyond bucket grants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default = "default_role_id")]
    pub id: String,

    /// Service allowed to assume the role
    #[serde(default = "default_service_principal")]
    pub service_principal: String,

    /// AWS managed policies, by name under `arn:<partition>:iam::aws:policy/`
    #[serde(default = "default_managed_policies")]
    pub managed_policies: Vec<String>,

    /// Secrets the jobs read at run time
    #[serde(default = "default_secrets")]
    pub secrets: Vec<SecretGrant>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            id: default_role_id(),
            service_principal: default_service_principal(),
            managed_policies: default_managed_policies(),
            secrets: default_secrets(),
        }
    }
}

impl RoleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.service_principal.is_empty() {
            bail!("Service principal cannot be empty");
        }
        for secret in &self.secrets {
            if !secret.arn.starts_with("arn:") || !secret.arn.contains(":secretsmanager:") {
                bail!("'{}' is not a Secrets Manager ARN", secret.arn);
            }
            if secret.arn.contains('*') {
                bail!("Secret grant '{}' must name exactly one secret", secret.arn);
            }
            if secret.actions.is_empty() {
                bail!("Secret grant '{}' has no actions", secret.arn);
            }
        }
        Ok(())
    }
}

/// Read access to one named secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretGrant {
    pub arn: String,

    #[serde(default = "default_secret_actions")]
    pub actions: Vec<String>,
}

fn default_role_id() -> String {
    "my_glue_role".to_string()
}

fn default_service_principal() -> String {
    "glue.amazonaws.com".to_string()
}

fn default_managed_policies() -> Vec<String> {
    vec!["service-role/AWSGlueServiceRole".to_string()]
}

fn default_secrets() -> Vec<SecretGrant> {
    vec![SecretGrant {
        arn: "arn:aws:secretsmanager:us-west-2:943686807189:secret:finalproject/daniel/ticketmaster-Gu2UO4"
            .to_string(),
        actions: default_secret_actions(),
    }]
}

fn default_secret_actions() -> Vec<String> {
    vec!["secretsmanager:GetSecretValue".to_string()]
}

// ============================================================================
// Buckets
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketsConfig {
    /// Output data; the role gets read-write
    #[serde(default = "default_data_bucket")]
    pub data: BucketConfig,

    /// Uploaded job scripts; the role gets read-only
    #[serde(default = "default_scripts_bucket")]
    pub scripts: BucketConfig,
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            data: default_data_bucket(),
            scripts: default_scripts_bucket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    pub id: String,

    #[serde(default = "default_true")]
    pub versioned: bool,

    #[serde(default)]
    pub access: BucketAccess,

    /// What teardown does to the bucket
    #[serde(default = "default_bucket_removal")]
    pub removal: RemovalPolicy,

    /// Empty the bucket on teardown so deletion can succeed
    #[serde(default = "default_true")]
    pub auto_delete_objects: bool,
}

impl BucketConfig {
    pub fn validate(&self) -> Result<()> {
        if self.auto_delete_objects && self.removal != RemovalPolicy::Destroy {
            bail!(
                "Bucket '{}' keeps its data on teardown (removal = \"{}\") but would be emptied first; set auto_delete_objects = false",
                self.id,
                self.removal
            );
        }
        Ok(())
    }
}

/// Public exposure of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketAccess {
    /// Objects readable by anyone
    PublicRead,
    /// All four public access blocks on
    #[default]
    BlockAll,
}

impl fmt::Display for BucketAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicRead => write!(f, "public-read"),
            Self::BlockAll => write!(f, "block-all"),
        }
    }
}

fn default_data_bucket() -> BucketConfig {
    BucketConfig {
        id: "final_data".to_string(),
        versioned: true,
        access: BucketAccess::PublicRead,
        removal: RemovalPolicy::Destroy,
        auto_delete_objects: true,
    }
}

fn default_scripts_bucket() -> BucketConfig {
    BucketConfig {
        id: "glue_scripts".to_string(),
        versioned: true,
        access: BucketAccess::BlockAll,
        removal: RemovalPolicy::Destroy,
        auto_delete_objects: true,
    }
}

fn default_bucket_removal() -> RemovalPolicy {
    RemovalPolicy::Destroy
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Assets
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_assets_id")]
    pub id: String,

    /// Local directory holding the scripts (`~` is expanded)
    #[serde(default = "default_assets_source")]
    pub source: String,

    /// Key prefix inside the scripts bucket
    #[serde(default = "default_assets_prefix")]
    pub key_prefix: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            id: default_assets_id(),
            source: default_assets_source(),
            key_prefix: default_assets_prefix(),
        }
    }
}

impl AssetsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source.is_empty() {
            bail!("Asset source directory cannot be empty");
        }
        if self.key_prefix.starts_with('/') {
            bail!("Key prefix '{}' must not start with '/'", self.key_prefix);
        }
        if !self.key_prefix.is_empty() && !self.key_prefix.ends_with('/') {
            bail!("Key prefix '{}' must end with '/'", self.key_prefix);
        }
        Ok(())
    }

    /// Object key a script is uploaded to
    pub fn key_for(&self, relative: &str) -> String {
        format!("{}{}", self.key_prefix, relative)
    }
}

fn default_assets_id() -> String {
    "deploy_assets".to_string()
}

fn default_assets_source() -> String {
    "./assets/".to_string()
}

fn default_assets_prefix() -> String {
    "assets/".to_string()
}

// ============================================================================
// Workflow
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_workflow_id")]
    pub id: String,

    #[serde(default = "default_workflow_id")]
    pub name: String,

    #[serde(default = "default_workflow_description")]
    pub description: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            id: default_workflow_id(),
            name: default_workflow_id(),
            description: default_workflow_description(),
        }
    }
}

fn default_workflow_id() -> String {
    "ticketmaster_workflow".to_string()
}

fn default_workflow_description() -> String {
    "Workflow for processing Ticketmaster data to parquet".to_string()
}

// ============================================================================
// Jobs
// ============================================================================

/// Argument carrying `python_modules`
const PYTHON_MODULES_ARGUMENT: &str = "--additional-python-modules";

/// Allowed capacities for python shell jobs (DPUs)
const PYTHON_SHELL_CAPACITIES: [f64; 2] = [0.0625, 1.0];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name, also its construct id
    pub name: String,

    /// Script file, relative to the asset directory
    pub script: String,

    #[serde(default)]
    pub description: String,

    /// Runtime environment tag
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_python_version")]
    pub python_version: String,

    #[serde(default = "default_glue_version")]
    pub glue_version: String,

    /// Capacity ceiling in DPUs
    #[serde(default = "default_max_capacity")]
    pub max_capacity: f64,

    /// Timeout in minutes
    #[serde(default = "default_timeout")]
    pub timeout: u32,

    /// Argument that receives the data bucket name
    #[serde(default = "default_bucket_argument")]
    pub bucket_argument: String,

    /// Pinned libraries installed before the script runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub python_modules: Vec<String>,

    /// Any other fixed arguments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, String>,
}

impl JobConfig {
    pub fn new(name: &str, script: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            script: script.to_string(),
            description: description.to_string(),
            command: default_command(),
            python_version: default_python_version(),
            glue_version: default_glue_version(),
            max_capacity: default_max_capacity(),
            timeout: default_timeout(),
            bucket_argument: default_bucket_argument(),
            python_modules: Vec::new(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_glue_name("job", &self.name)?;
        if !CONSTRUCT_ID.is_match(&self.name) {
            bail!("Job name '{}' cannot be used as a construct id", self.name);
        }
        if self.script.is_empty() || self.script.starts_with('/') {
            bail!("Script must be a path relative to the asset directory");
        }
        if self.timeout == 0 {
            bail!("Timeout must be at least one minute");
        }
        if self.command == "pythonshell"
            && !PYTHON_SHELL_CAPACITIES
                .iter()
                .any(|c| (c - self.max_capacity).abs() < f64::EPSILON)
        {
            bail!(
                "Python shell jobs accept a capacity of 0.0625 or 1, not {}",
                self.max_capacity
            );
        }
        for key in self.arguments.keys() {
            if !key.starts_with("--") {
                bail!("Argument '{key}' must start with '--'");
            }
        }
        if !self.bucket_argument.starts_with("--") {
            bail!("Argument '{}' must start with '--'", self.bucket_argument);
        }
        for reserved in [self.bucket_argument.as_str(), PYTHON_MODULES_ARGUMENT] {
            if self.arguments.contains_key(reserved) {
                bail!("Argument '{reserved}' is set by the stack and cannot be given a fixed value");
            }
        }
        Ok(())
    }

    /// The fixed argument map passed at every invocation, minus the bucket
    /// argument which is wired by reference
    pub fn literal_arguments(&self) -> BTreeMap<String, String> {
        let mut args = self.arguments.clone();
        if !self.python_modules.is_empty() {
            args.insert(
                PYTHON_MODULES_ARGUMENT.to_string(),
                self.python_modules.join(","),
            );
        }
        args
    }
}

fn default_command() -> String {
    "pythonshell".to_string()
}

fn default_python_version() -> String {
    "3.9".to_string()
}

fn default_glue_version() -> String {
    "3.0".to_string()
}

fn default_max_capacity() -> f64 {
    1.0
}

fn default_timeout() -> u32 {
    3
}

fn default_bucket_argument() -> String {
    "--my_bucket".to_string()
}

fn default_jobs() -> Vec<JobConfig> {
    let mut analysis = JobConfig::new(
        "parquet_analysis_job",
        "V2TicketMasterAnalysis_Final.py",
        "Analyse the combined parquet and publish charts",
    );
    analysis.python_modules = vec![
        "dython==0.7.5".to_string(),
        "matplotlib==3.8.3".to_string(),
        "folium==0.16.0".to_string(),
    ];

    vec![
        JobConfig::new(
            "download_ticketmaster_data",
            "ticketmaster_to_parquet.py",
            "Download events from Ticketmaster and store them as parquet",
        ),
        JobConfig::new(
            "fragments_to_parquet_job",
            "merge_parquet_final.py",
            "Merge the latest pull into combined_data.parquet",
        ),
        analysis,
    ]
}

// ============================================================================
// Triggers
// ============================================================================

/// Terminal job-run states a conditional trigger can wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobRunState {
    #[default]
    Succeeded,
    Failed,
    Timeout,
    Stopped,
    Error,
}

impl JobRunState {
    /// Literal the orchestration service compares against
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for JobRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,

    /// Job this trigger starts
    pub job: String,

    #[serde(default = "default_true")]
    pub start_on_creation: bool,

    #[serde(flatten)]
    pub kind: TriggerKind,
}

/// When a trigger fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TriggerKind {
    /// On a fixed cron schedule
    Scheduled { schedule: String },
    /// When one upstream job reaches a terminal state
    Conditional {
        after: String,
        #[serde(default)]
        state: JobRunState,
    },
}

fn default_triggers() -> Vec<TriggerConfig> {
    vec![
        TriggerConfig {
            name: "initial_trigger".to_string(),
            job: "download_ticketmaster_data".to_string(),
            start_on_creation: true,
            // 11:00 UTC, 4:00 in California
            kind: TriggerKind::Scheduled {
                schedule: "cron(0 11 * * ? *)".to_string(),
            },
        },
        TriggerConfig {
            name: "frag_trigger".to_string(),
            job: "fragments_to_parquet_job".to_string(),
            start_on_creation: true,
            kind: TriggerKind::Conditional {
                after: "download_ticketmaster_data".to_string(),
                state: JobRunState::Succeeded,
            },
        },
        TriggerConfig {
            name: "analysis_trigger".to_string(),
            job: "parquet_analysis_job".to_string(),
            start_on_creation: true,
            kind: TriggerKind::Conditional {
                after: "fragments_to_parquet_job".to_string(),
                state: JobRunState::Succeeded,
            },
        },
    ]
}

// ============================================================================
// Catalog
// ============================================================================

/// Glue database + crawler over the processed prefix of the data bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_database_description")]
    pub description: String,

    #[serde(default = "default_crawler")]
    pub crawler: String,

    /// Prefix of the data bucket the crawler scans
    #[serde(default = "default_crawl_prefix")]
    pub target_prefix: String,

    #[serde(default = "default_crawler_trigger")]
    pub trigger: String,

    /// Job whose success starts the crawler
    #[serde(default = "default_crawl_after")]
    pub after: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database: default_database(),
            description: default_database_description(),
            crawler: default_crawler(),
            target_prefix: default_crawl_prefix(),
            trigger: default_crawler_trigger(),
            after: default_crawl_after(),
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        check_glue_name("database", &self.database)?;
        check_glue_name("crawler", &self.crawler)?;
        check_glue_name("trigger", &self.trigger)?;
        if !CONSTRUCT_ID.is_match(&self.database) || !CONSTRUCT_ID.is_match(&self.crawler) {
            bail!("Catalog names must be usable as construct ids");
        }
        Ok(())
    }
}

fn default_database() -> String {
    "ticketmaster_db".to_string()
}

fn default_database_description() -> String {
    "Data catalog for ticketmaster data".to_string()
}

fn default_crawler() -> String {
    "ticketmaster_crawler".to_string()
}

fn default_crawl_prefix() -> String {
    "Processed".to_string()
}

fn default_crawler_trigger() -> String {
    "crawler_trigger".to_string()
}

fn default_crawl_after() -> String {
    "fragments_to_parquet_job".to_string()
}

// ============================================================================
// Tests
// ============================================================================
