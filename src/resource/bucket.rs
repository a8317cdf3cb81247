//! Bucket resources - storage, its resource policy and teardown cleanup

use declarative::intrinsic;
use serde_json::{Map, Value, json};

use super::policy::{PolicyStatement, objects_arn, policy_document};
use super::{RemovalPolicy, Resource, types};
use crate::schema::{BucketAccess, BucketConfig};

/// Tag the cleanup handler looks for before emptying a bucket
pub const AUTO_DELETE_TAG: &str = "gluestack:auto-delete-objects";

/// An object storage bucket
#[derive(Debug, Clone)]
pub struct Bucket {
    pub id: String,
    pub versioned: bool,
    pub access: BucketAccess,
    pub removal: RemovalPolicy,
    pub auto_delete_objects: bool,
}

impl Bucket {
    pub fn from_config(config: &BucketConfig) -> Self {
        Self {
            id: config.id.clone(),
            versioned: config.versioned,
            access: config.access,
            removal: config.removal,
            auto_delete_objects: config.auto_delete_objects,
        }
    }

    pub fn is_public(&self) -> bool {
        self.access == BucketAccess::PublicRead
    }

    fn public_access_block(&self) -> Value {
        // Public read keeps ACLs blocked and lets a bucket policy open objects
        let allow_policy = self.is_public();
        json!({
            "BlockPublicAcls": true,
            "BlockPublicPolicy": !allow_policy,
            "IgnorePublicAcls": true,
            "RestrictPublicBuckets": !allow_policy,
        })
    }
}

impl Resource for Bucket {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        let mut desc = format!("Bucket {} ({})", self.id, self.access);
        if self.versioned {
            desc.push_str(", versioned");
        }
        desc
    }

    fn resource_type(&self) -> &'static str {
        types::BUCKET
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("PublicAccessBlockConfiguration".into(), self.public_access_block());
        if self.auto_delete_objects {
            props.insert(
                "Tags".into(),
                json!([{ "Key": AUTO_DELETE_TAG, "Value": "true" }]),
            );
        }
        if self.versioned {
            props.insert(
                "VersioningConfiguration".into(),
                json!({ "Status": "Enabled" }),
            );
        }
        props
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(self.removal)
    }
}

/// Resource policy attached to a bucket
#[derive(Debug, Clone)]
pub struct BucketPolicy {
    /// Construct id of the owning bucket
    pub bucket_id: String,
    /// Logical ID of the owning bucket
    pub bucket: String,
    pub statements: Vec<PolicyStatement>,
}

impl BucketPolicy {
    /// Anonymous `s3:GetObject` on every object
    pub fn public_read(bucket_id: &str, bucket: &str) -> Self {
        Self {
            bucket_id: bucket_id.to_string(),
            bucket: bucket.to_string(),
            statements: vec![
                PolicyStatement::allow(&["s3:GetObject"], vec![objects_arn(bucket)])
                    .with_principal(json!({ "AWS": "*" })),
            ],
        }
    }
}

impl Resource for BucketPolicy {
    fn id(&self) -> String {
        format!("{}/Policy", self.bucket_id)
    }

    fn description(&self) -> String {
        format!("Resource policy for {}", self.bucket_id)
    }

    fn resource_type(&self) -> &'static str {
        types::BUCKET_POLICY
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("Bucket".into(), intrinsic::reference(&self.bucket));
        props.insert("PolicyDocument".into(), policy_document(&self.statements));
        props
    }
}

/// Custom resource that empties a bucket before it is deleted
#[derive(Debug, Clone)]
pub struct AutoDeleteObjects {
    pub bucket_id: String,
    pub bucket: String,
    /// Parameter holding the handler's service token
    pub service_token: String,
    /// Bucket policy that must exist first, so cleanup runs before it goes
    pub after_policy: Option<String>,
}

impl Resource for AutoDeleteObjects {
    fn id(&self) -> String {
        format!("{}/AutoDeleteObjectsCustomResource", self.bucket_id)
    }

    fn description(&self) -> String {
        format!("Empty {} on teardown", self.bucket_id)
    }

    fn resource_type(&self) -> &'static str {
        types::AUTO_DELETE_OBJECTS
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("BucketName".into(), intrinsic::reference(&self.bucket));
        props.insert("ServiceToken".into(), intrinsic::reference(&self.service_token));
        props
    }

    fn depends_on(&self) -> Vec<String> {
        self.after_policy.iter().cloned().collect()
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(RemovalPolicy::Destroy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BucketsConfig;

    #[test]
    fn test_private_bucket_blocks_everything() {
        let bucket = Bucket::from_config(&BucketsConfig::default().scripts);
        let props = bucket.properties();
        let block = &props["PublicAccessBlockConfiguration"];
        for key in ["BlockPublicAcls", "BlockPublicPolicy", "IgnorePublicAcls", "RestrictPublicBuckets"] {
            assert_eq!(block[key], json!(true), "{key}");
        }
        assert_eq!(props["VersioningConfiguration"]["Status"], json!("Enabled"));
        assert_eq!(bucket.removal_policy(), Some(RemovalPolicy::Destroy));
    }

    #[test]
    fn test_public_bucket_allows_policy() {
        let bucket = Bucket::from_config(&BucketsConfig::default().data);
        assert!(bucket.is_public());
        let block = &bucket.properties()["PublicAccessBlockConfiguration"];
        assert_eq!(block["BlockPublicPolicy"], json!(false));
        assert_eq!(block["BlockPublicAcls"], json!(true));
    }

    #[test]
    fn test_auto_delete_tag_only_when_enabled() {
        let mut config = BucketsConfig::default().data;
        assert!(Bucket::from_config(&config).properties().contains_key("Tags"));
        config.auto_delete_objects = false;
        assert!(!Bucket::from_config(&config).properties().contains_key("Tags"));
    }

    #[test]
    fn test_public_read_policy() {
        let policy = BucketPolicy::public_read("final_data", "FinalData1234ABCD");
        assert_eq!(policy.id(), "final_data/Policy");
        let props = policy.properties();
        assert_eq!(props["Bucket"], intrinsic::reference("FinalData1234ABCD"));
        let statement = &props["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Action"], json!("s3:GetObject"));
        assert_eq!(statement["Principal"], json!({ "AWS": "*" }));
    }

    #[test]
    fn test_auto_delete_waits_for_policy() {
        let cleanup = AutoDeleteObjects {
            bucket_id: "final_data".into(),
            bucket: "FinalData".into(),
            service_token: "AutoDeleteObjectsProviderArn".into(),
            after_policy: Some("FinalDataPolicy".into()),
        };
        assert_eq!(cleanup.depends_on(), vec!["FinalDataPolicy".to_string()]);
        assert_eq!(
            cleanup.properties()["ServiceToken"],
            intrinsic::reference("AutoDeleteObjectsProviderArn")
        );
    }
}
