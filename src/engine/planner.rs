//! Stack planner - turns a declaration into a resource graph

use declarative::{ResourceGraph, intrinsic};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

use super::BuildError;
use crate::assets::StagedAsset;
use crate::resource::{
    AutoDeleteObjects, Bucket, BucketDeployment, BucketGrant, BucketPolicy, Crawler, Database,
    Job, Policy, PolicyStatement, Role, StagedObject, Trigger, TriggerAction, TriggerCondition,
    TriggerSchedule, Workflow,
};
use crate::schema::{
    BucketConfig, JobConfig, JobRunState, StackConfig, TriggerConfig, TriggerKind,
};

/// Parameter naming the bucket staged assets are uploaded to
pub const PARAM_STAGING_BUCKET: &str = "AssetStagingBucket";
/// Parameter holding the asset copy handler's service token
pub const PARAM_DEPLOYMENT_PROVIDER: &str = "BucketDeploymentProviderArn";
/// Parameter holding the bucket cleanup handler's service token
pub const PARAM_AUTO_DELETE_PROVIDER: &str = "AutoDeleteObjectsProviderArn";

type Result<T> = std::result::Result<T, BuildError>;

/// Build the full graph for a declaration
///
/// Order: role, buckets, grants, asset deployment, workflow, jobs, triggers,
/// then the catalog when enabled.
pub fn build_stack(config: &StackConfig, assets: &[StagedAsset]) -> Result<ResourceGraph> {
    let mut builder = StackBuilder::new(config);
    builder.add_role()?;
    builder.add_buckets()?;
    builder.add_grants()?;
    builder.add_asset_deployment(assets)?;
    builder.add_workflow()?;
    for job in &config.jobs {
        builder.add_job(job, assets)?;
    }
    for trigger in &config.triggers {
        builder.add_trigger(trigger)?;
    }
    if config.catalog.enabled {
        builder.add_catalog()?;
    }
    builder.finish()
}

/// Incremental graph construction that enforces declaration order
///
/// Each step records the logical IDs later steps wire to, so nothing
/// downstream refers to a resource by a hand-written identifier.
pub struct StackBuilder<'a> {
    config: &'a StackConfig,
    graph: ResourceGraph,
    role: Option<String>,
    policy: Option<String>,
    data_bucket: Option<String>,
    scripts_bucket: Option<String>,
    workflow: Option<String>,
    /// Grants made to the role, by bucket logical ID
    grants: HashMap<String, BucketGrant>,
    /// Declared jobs, name to logical ID
    jobs: BTreeMap<String, String>,
}

impl<'a> StackBuilder<'a> {
    pub fn new(config: &'a StackConfig) -> Self {
        Self {
            config,
            graph: ResourceGraph::new(),
            role: None,
            policy: None,
            data_bucket: None,
            scripts_bucket: None,
            workflow: None,
            grants: HashMap::new(),
            jobs: BTreeMap::new(),
        }
    }

    pub fn add_role(&mut self) -> Result<String> {
        let role = &self.config.role;
        check_construct_id("role", &role.id)?;
        let logical_id = self.graph.insert(Box::new(Role {
            id: role.id.clone(),
            service_principal: role.service_principal.clone(),
            managed_policies: role.managed_policies.clone(),
        }))?;
        self.role = Some(logical_id.clone());
        Ok(logical_id)
    }

    /// Both buckets, with a public-read policy and teardown cleanup as declared
    pub fn add_buckets(&mut self) -> Result<()> {
        let config = self.config;
        let buckets = &config.buckets;
        self.data_bucket = Some(self.add_bucket(&buckets.data)?);
        self.scripts_bucket = Some(self.add_bucket(&buckets.scripts)?);
        Ok(())
    }

    fn add_bucket(&mut self, config: &BucketConfig) -> Result<String> {
        check_construct_id("bucket", &config.id)?;
        let bucket = Bucket::from_config(config);
        let public = bucket.is_public();
        let logical_id = self.graph.insert(Box::new(bucket))?;

        let policy = if public {
            Some(
                self.graph
                    .insert(Box::new(BucketPolicy::public_read(&config.id, &logical_id)))?,
            )
        } else {
            None
        };

        if config.auto_delete_objects {
            let service_token = self.graph.add_parameter(
                PARAM_AUTO_DELETE_PROVIDER,
                "Service token of the handler that empties buckets on teardown",
            );
            self.graph.insert(Box::new(AutoDeleteObjects {
                bucket_id: config.id.clone(),
                bucket: logical_id.clone(),
                service_token,
                after_policy: policy,
            }))?;
        }

        Ok(logical_id)
    }

    /// Record a grant on a bucket; statements are emitted by `add_grants`
    pub fn grant(&mut self, bucket: &str, level: BucketGrant) {
        let entry = self.grants.entry(bucket.to_string()).or_insert(level);
        if level.covers(*entry) {
            *entry = level;
        }
    }

    /// The role's inline policy: read-write on data, read on scripts,
    /// and the declared secrets
    pub fn add_grants(&mut self) -> Result<String> {
        let role = require(self.role.as_ref(), "grants", "role")?.clone();
        let data = require(self.data_bucket.as_ref(), "grants", "data bucket")?.clone();
        let scripts = require(self.scripts_bucket.as_ref(), "grants", "scripts bucket")?.clone();

        self.grant(&data, BucketGrant::ReadWrite);
        self.grant(&scripts, BucketGrant::Read);

        let mut statements: Vec<PolicyStatement> = [&data, &scripts]
            .into_iter()
            .filter_map(|bucket| self.grants.get(bucket).map(|g| g.statement(bucket)))
            .collect();
        for secret in &self.config.role.secrets {
            let actions: Vec<&str> = secret.actions.iter().map(String::as_str).collect();
            statements.push(PolicyStatement::allow(&actions, vec![json!(secret.arn)]));
        }

        let logical_id = self.graph.insert(Box::new(Policy {
            role_id: self.config.role.id.clone(),
            role,
            statements,
        }))?;
        self.policy = Some(logical_id.clone());
        Ok(logical_id)
    }

    /// Upload of every staged asset into the scripts bucket
    pub fn add_asset_deployment(&mut self, assets: &[StagedAsset]) -> Result<Option<String>> {
        let scripts =
            require(self.scripts_bucket.as_ref(), "asset deployment", "scripts bucket")?.clone();
        if assets.is_empty() {
            log::debug!("No assets to deploy");
            return Ok(None);
        }
        check_construct_id("asset deployment", &self.config.assets.id)?;

        let staging_bucket = self.graph.add_parameter(
            PARAM_STAGING_BUCKET,
            "Bucket staged assets were uploaded to",
        );
        let service_token = self.graph.add_parameter(
            PARAM_DEPLOYMENT_PROVIDER,
            "Service token of the handler that copies staged assets",
        );

        let logical_id = self.graph.insert(Box::new(BucketDeployment {
            id: self.config.assets.id.clone(),
            destination: scripts,
            key_prefix: self.config.assets.key_prefix.clone(),
            staging_bucket,
            service_token,
            objects: assets
                .iter()
                .map(|asset| StagedObject {
                    source_key: asset.staging_key(),
                    relative: asset.relative.clone(),
                })
                .collect(),
            after: Vec::new(),
        }))?;
        Ok(Some(logical_id))
    }

    pub fn add_workflow(&mut self) -> Result<String> {
        check_construct_id("workflow", &self.config.workflow.id)?;
        let logical_id = self
            .graph
            .insert(Box::new(Workflow::from_config(&self.config.workflow)))?;
        self.workflow = Some(logical_id.clone());
        Ok(logical_id)
    }

    /// Declare one job; its script must be among the assets and the role
    /// must already hold the bucket grants the job relies on
    pub fn add_job(&mut self, job: &JobConfig, assets: &[StagedAsset]) -> Result<String> {
        let config = self.config;
        check_construct_id("job", &job.name)?;

        let role = require(self.role.as_ref(), "jobs", "role")?.clone();
        let data = require(self.data_bucket.as_ref(), "jobs", "data bucket")?.clone();
        let scripts = require(self.scripts_bucket.as_ref(), "jobs", "scripts bucket")?.clone();

        for (bucket, needed, label) in [
            (&data, BucketGrant::ReadWrite, "read-write on the data bucket"),
            (&scripts, BucketGrant::Read, "read on the scripts bucket"),
        ] {
            let granted = self.grants.get(bucket).is_some_and(|g| g.covers(needed));
            if !granted || self.policy.is_none() {
                return Err(BuildError::RoleNotGranted {
                    job: job.name.clone(),
                    role: config.role.id.clone(),
                    missing: label.to_string(),
                });
            }
        }

        if !assets.iter().any(|a| a.relative == job.script) {
            return Err(BuildError::MissingScript {
                job: job.name.clone(),
                script: job.script.clone(),
            });
        }

        let mut resource = Job::from_config(
            job,
            &role,
            &scripts,
            config.assets.key_for(&job.script),
            &data,
        );
        resource.after = self.policy.iter().cloned().collect();

        let logical_id = self.graph.insert(Box::new(resource))?;
        self.jobs.insert(job.name.clone(), logical_id.clone());
        Ok(logical_id)
    }

    /// Declare one trigger; every job it names must already be declared
    pub fn add_trigger(&mut self, trigger: &TriggerConfig) -> Result<String> {
        check_construct_id("trigger", &trigger.name)?;
        let workflow = require(self.workflow.as_ref(), "triggers", "workflow")?.clone();

        let mut after = vec![self.job_id(&trigger.name, &trigger.job)?];
        let schedule = match &trigger.kind {
            TriggerKind::Scheduled { schedule } => TriggerSchedule::Cron(schedule.clone()),
            TriggerKind::Conditional { after: upstream, state } => {
                let upstream_id = self.job_id(&trigger.name, upstream)?;
                if !after.contains(&upstream_id) {
                    after.push(upstream_id);
                }
                TriggerSchedule::After(vec![TriggerCondition {
                    job: upstream.clone(),
                    state: *state,
                }])
            }
        };

        let logical_id = self.graph.insert(Box::new(Trigger {
            name: trigger.name.clone(),
            schedule,
            actions: vec![TriggerAction::Job(trigger.job.clone())],
            start_on_creation: trigger.start_on_creation,
            workflow,
            after,
        }))?;
        Ok(logical_id)
    }

    /// Database, crawler over the processed prefix, and the trigger that
    /// starts the crawler once its upstream job succeeds
    pub fn add_catalog(&mut self) -> Result<()> {
        let catalog = &self.config.catalog;
        let role = require(self.role.as_ref(), "catalog", "role")?.clone();
        let data = require(self.data_bucket.as_ref(), "catalog", "data bucket")?.clone();
        let workflow = require(self.workflow.as_ref(), "catalog", "workflow")?.clone();
        check_construct_id("database", &catalog.database)?;
        check_construct_id("crawler", &catalog.crawler)?;
        check_construct_id("trigger", &catalog.trigger)?;
        let upstream = self.job_id(&catalog.trigger, &catalog.after)?;

        let database = self.graph.insert(Box::new(Database {
            name: catalog.database.clone(),
            description: catalog.description.clone(),
        }))?;
        let crawler = self.graph.insert(Box::new(Crawler {
            name: catalog.crawler.clone(),
            role,
            database,
            bucket: data,
            prefix: catalog.target_prefix.clone(),
        }))?;
        self.graph.insert(Box::new(Trigger {
            name: catalog.trigger.clone(),
            schedule: TriggerSchedule::After(vec![TriggerCondition {
                job: catalog.after.clone(),
                state: JobRunState::Succeeded,
            }]),
            actions: vec![TriggerAction::Crawler(catalog.crawler.clone())],
            start_on_creation: true,
            workflow,
            after: vec![crawler, upstream],
        }))?;
        Ok(())
    }

    /// Add the stack outputs and hand back the checked graph
    pub fn finish(mut self) -> Result<ResourceGraph> {
        let data = require(self.data_bucket.as_ref(), "outputs", "data bucket")?.clone();
        let scripts = require(self.scripts_bucket.as_ref(), "outputs", "scripts bucket")?.clone();
        let role = require(self.role.as_ref(), "outputs", "role")?.clone();
        let workflow = require(self.workflow.as_ref(), "outputs", "workflow")?.clone();

        self.graph.add_output(
            "DataBucketName",
            "Bucket receiving pipeline output",
            intrinsic::reference(&data),
        );
        self.graph.add_output(
            "ScriptsBucketName",
            "Bucket holding job scripts",
            intrinsic::reference(&scripts),
        );
        self.graph.add_output(
            "RoleArn",
            "Role the jobs run as",
            intrinsic::get_att(&role, "Arn"),
        );
        self.graph.add_output(
            "WorkflowName",
            "Workflow grouping the triggers",
            intrinsic::reference(&workflow),
        );

        self.graph.check_references()?;
        log::debug!(
            "Planned {} resources for {}",
            self.graph.len(),
            self.config.stack.name
        );
        Ok(self.graph)
    }

    fn job_id(&self, trigger: &str, job: &str) -> Result<String> {
        self.jobs
            .get(job)
            .cloned()
            .ok_or_else(|| BuildError::UnknownJob {
                trigger: trigger.to_string(),
                job: job.to_string(),
            })
    }
}

fn require<'v>(
    value: Option<&'v String>,
    step: &'static str,
    requires: &'static str,
) -> Result<&'v String> {
    value.ok_or(BuildError::OutOfOrder { step, requires })
}

/// Names become construct paths, so they cannot be empty or nest
fn check_construct_id(kind: &'static str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(BuildError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}
