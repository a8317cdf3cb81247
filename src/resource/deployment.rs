//! Asset deployment - copies staged files into a bucket at deploy time

use declarative::intrinsic;
use serde_json::{Map, Value, json};

use super::{Resource, types};

/// One staged file and where it lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    /// Key in the staging bucket
    pub source_key: String,
    /// Key in the destination bucket, below the deployment prefix
    pub relative: String,
}

/// Custom resource that copies staged objects into a destination bucket
#[derive(Debug, Clone)]
pub struct BucketDeployment {
    pub id: String,
    /// Logical ID of the destination bucket
    pub destination: String,
    pub key_prefix: String,
    /// Parameter naming the bucket staged assets were uploaded to
    pub staging_bucket: String,
    /// Parameter holding the copy handler's service token
    pub service_token: String,
    pub objects: Vec<StagedObject>,
    /// Resources that must exist before the copy runs (the destination's policy)
    pub after: Vec<String>,
}

impl Resource for BucketDeployment {
    fn id(&self) -> String {
        format!("{}/CustomResource", self.id)
    }

    fn description(&self) -> String {
        format!("Upload {} file(s) to {}", self.objects.len(), self.key_prefix)
    }

    fn resource_type(&self) -> &'static str {
        types::BUCKET_DEPLOYMENT
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(
            "DestinationBucketKeyPrefix".into(),
            json!(self.key_prefix),
        );
        props.insert(
            "DestinationBucketName".into(),
            intrinsic::reference(&self.destination),
        );
        props.insert("Extract".into(), json!(false));
        props.insert("Prune".into(), json!(true));
        props.insert("ServiceToken".into(), intrinsic::reference(&self.service_token));
        props.insert(
            "SourceBucketNames".into(),
            Value::Array(
                self.objects
                    .iter()
                    .map(|_| intrinsic::reference(&self.staging_bucket))
                    .collect(),
            ),
        );
        props.insert(
            "SourceObjectKeys".into(),
            Value::Array(self.objects.iter().map(|o| json!(o.source_key)).collect()),
        );
        props
    }

    fn depends_on(&self) -> Vec<String> {
        self.after.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_source_bucket_per_object() {
        let deployment = BucketDeployment {
            id: "deploy_assets".into(),
            destination: "GlueScripts".into(),
            key_prefix: "assets/".into(),
            staging_bucket: "AssetStagingBucket".into(),
            service_token: "BucketDeploymentProviderArn".into(),
            objects: vec![
                StagedObject {
                    source_key: "aa/a.py".into(),
                    relative: "a.py".into(),
                },
                StagedObject {
                    source_key: "bb/b.py".into(),
                    relative: "b.py".into(),
                },
            ],
            after: Vec::new(),
        };
        let props = deployment.properties();
        assert_eq!(props["SourceBucketNames"].as_array().unwrap().len(), 2);
        assert_eq!(props["SourceObjectKeys"], json!(["aa/a.py", "bb/b.py"]));
        assert_eq!(props["DestinationBucketKeyPrefix"], json!("assets/"));
        assert_eq!(props["Prune"], json!(true));
        assert_eq!(deployment.id(), "deploy_assets/CustomResource");
    }
}
