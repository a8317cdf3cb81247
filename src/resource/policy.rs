//! IAM policy statements and bucket grants

use declarative::intrinsic;
use serde_json::{Map, Value, json};

/// Policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// One allow statement of a policy document
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    /// Principal block, for resource policies only
    pub principal: Option<Value>,
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Value>) -> Self {
        Self {
            principal: None,
            actions: actions.iter().map(ToString::to_string).collect(),
            resources,
        }
    }

    pub fn with_principal(mut self, principal: Value) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Statement as it appears in a policy document
    ///
    /// Single actions and resources collapse to scalars.
    pub fn to_value(&self) -> Value {
        let mut statement = Map::new();
        statement.insert("Action".into(), scalar_or_list(self.actions.iter().map(|a| json!(a)).collect()));
        statement.insert("Effect".into(), json!("Allow"));
        if let Some(principal) = &self.principal {
            statement.insert("Principal".into(), principal.clone());
        }
        statement.insert("Resource".into(), scalar_or_list(self.resources.clone()));
        Value::Object(statement)
    }
}

fn scalar_or_list(mut items: Vec<Value>) -> Value {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Value::Array(items)
    }
}

/// `{"Statement": [...], "Version": "2012-10-17"}`
pub fn policy_document(statements: &[PolicyStatement]) -> Value {
    json!({
        "Statement": statements.iter().map(PolicyStatement::to_value).collect::<Vec<_>>(),
        "Version": POLICY_VERSION,
    })
}

/// Access level a role is granted on a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketGrant {
    Read,
    ReadWrite,
}

const READ_ACTIONS: [&str; 3] = ["s3:GetObject*", "s3:GetBucket*", "s3:List*"];

const WRITE_ACTIONS: [&str; 7] = [
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

impl BucketGrant {
    pub fn actions(&self) -> Vec<&'static str> {
        match self {
            Self::Read => READ_ACTIONS.to_vec(),
            Self::ReadWrite => READ_ACTIONS.iter().chain(WRITE_ACTIONS.iter()).copied().collect(),
        }
    }

    /// Whether this grant includes everything `other` does
    pub fn covers(&self, other: Self) -> bool {
        matches!((self, other), (Self::ReadWrite, _) | (Self::Read, Self::Read))
    }

    /// Statement granting this access on a bucket and its objects
    pub fn statement(&self, bucket: &str) -> PolicyStatement {
        PolicyStatement::allow(
            &self.actions(),
            vec![
                intrinsic::get_att(bucket, "Arn"),
                objects_arn(bucket),
            ],
        )
    }
}

/// `<bucket arn>/*`
pub fn objects_arn(bucket: &str) -> Value {
    intrinsic::join("", vec![intrinsic::get_att(bucket, "Arn"), json!("/*")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_action_collapses_to_string() {
        let statement = PolicyStatement::allow(
            &["secretsmanager:GetSecretValue"],
            vec![json!("arn:aws:secretsmanager:us-west-2:1:secret:x")],
        );
        let value = statement.to_value();
        assert_eq!(value["Effect"], json!("Allow"));
        assert_eq!(value["Action"], json!("secretsmanager:GetSecretValue"));
        assert_eq!(value["Resource"], json!("arn:aws:secretsmanager:us-west-2:1:secret:x"));
        assert!(value.get("Principal").is_none());
    }

    #[test]
    fn test_read_write_is_superset_of_read() {
        let rw = BucketGrant::ReadWrite.actions();
        for action in BucketGrant::Read.actions() {
            assert!(rw.contains(&action));
        }
        assert!(rw.contains(&"s3:PutObject"));
        assert!(!BucketGrant::Read.actions().contains(&"s3:PutObject"));
        assert!(BucketGrant::ReadWrite.covers(BucketGrant::Read));
        assert!(!BucketGrant::Read.covers(BucketGrant::ReadWrite));
    }

    #[test]
    fn test_grant_covers_bucket_and_objects() {
        let value = BucketGrant::Read.statement("Scripts").to_value();
        let resources = value["Resource"].as_array().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(intrinsic::render(&resources[1]), "${Scripts.Arn}/*");
    }

    #[test]
    fn test_policy_document_shape() {
        let doc = policy_document(&[PolicyStatement::allow(&["s3:GetObject"], vec![json!("*")])
            .with_principal(json!({"AWS": "*"}))]);
        assert_eq!(doc["Version"], json!(POLICY_VERSION));
        assert_eq!(doc["Statement"][0]["Principal"], json!({"AWS": "*"}));
    }
}
