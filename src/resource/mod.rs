//! Cloud resources declared by the stack
//!
//! Every entry of the provisioning document is modeled as a Resource with:
//! - A construct path (`final_data`, `my_glue_role/DefaultPolicy`)
//! - A provisioning type (`AWS::S3::Bucket`, `AWS::Glue::Job`)
//! - A property document that refers to other resources only by logical ID

pub use declarative::{RemovalPolicy, Resource};

pub mod bucket;
pub mod catalog;
pub mod deployment;
pub mod job;
pub mod policy;
pub mod role;
pub mod trigger;
pub mod workflow;

pub use bucket::{AutoDeleteObjects, Bucket, BucketPolicy};
pub use catalog::{Crawler, Database};
pub use deployment::{BucketDeployment, StagedObject};
pub use job::Job;
pub use policy::{BucketGrant, PolicyStatement};
pub use role::{Policy, Role};
pub use trigger::{Trigger, TriggerAction, TriggerCondition, TriggerSchedule};
pub use workflow::Workflow;

/// Provisioning types used across the crate
pub mod types {
    pub const BUCKET: &str = "AWS::S3::Bucket";
    pub const BUCKET_POLICY: &str = "AWS::S3::BucketPolicy";
    pub const AUTO_DELETE_OBJECTS: &str = "Custom::S3AutoDeleteObjects";
    pub const BUCKET_DEPLOYMENT: &str = "Custom::CDKBucketDeployment";
    pub const ROLE: &str = "AWS::IAM::Role";
    pub const POLICY: &str = "AWS::IAM::Policy";
    pub const WORKFLOW: &str = "AWS::Glue::Workflow";
    pub const JOB: &str = "AWS::Glue::Job";
    pub const TRIGGER: &str = "AWS::Glue::Trigger";
    pub const DATABASE: &str = "AWS::Glue::Database";
    pub const CRAWLER: &str = "AWS::Glue::Crawler";
}
