//! Execution role and its inline grants

use declarative::intrinsic;
use serde_json::{Map, Value, json};

use super::policy::{POLICY_VERSION, PolicyStatement, policy_document};
use super::{Resource, types};

/// A role assumable by one service
#[derive(Debug, Clone)]
pub struct Role {
    pub id: String,
    pub service_principal: String,
    /// Managed policy names under `arn:<partition>:iam::aws:policy/`
    pub managed_policies: Vec<String>,
}

impl Resource for Role {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        format!("Role assumed by {}", self.service_principal)
    }

    fn resource_type(&self) -> &'static str {
        types::ROLE
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(
            "AssumeRolePolicyDocument".into(),
            json!({
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": self.service_principal },
                }],
                "Version": POLICY_VERSION,
            }),
        );
        if !self.managed_policies.is_empty() {
            props.insert(
                "ManagedPolicyArns".into(),
                Value::Array(
                    self.managed_policies
                        .iter()
                        .map(|name| intrinsic::managed_policy_arn(name))
                        .collect(),
                ),
            );
        }
        props
    }
}

/// Inline policy holding every grant made to a role
#[derive(Debug, Clone)]
pub struct Policy {
    /// Construct id of the role
    pub role_id: String,
    /// Logical ID of the role
    pub role: String,
    pub statements: Vec<PolicyStatement>,
}

impl Policy {
    /// Physical policy name, unique within the role
    pub fn policy_name(&self) -> String {
        self.logical_id()
    }
}

impl Resource for Policy {
    fn id(&self) -> String {
        format!("{}/DefaultPolicy", self.role_id)
    }

    fn description(&self) -> String {
        format!("{} grants for {}", self.statements.len(), self.role_id)
    }

    fn resource_type(&self) -> &'static str {
        types::POLICY
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("PolicyDocument".into(), policy_document(&self.statements));
        props.insert("PolicyName".into(), json!(self.policy_name()));
        props.insert("Roles".into(), json!([intrinsic::reference(&self.role)]));
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::BucketGrant;

    fn glue_role() -> Role {
        Role {
            id: "my_glue_role".into(),
            service_principal: "glue.amazonaws.com".into(),
            managed_policies: vec!["service-role/AWSGlueServiceRole".into()],
        }
    }

    #[test]
    fn test_role_trust_and_managed_policy() {
        let props = glue_role().properties();
        let statement = &props["AssumeRolePolicyDocument"]["Statement"][0];
        assert_eq!(statement["Principal"]["Service"], json!("glue.amazonaws.com"));
        assert_eq!(statement["Action"], json!("sts:AssumeRole"));
        let arns = props["ManagedPolicyArns"].as_array().unwrap();
        assert_eq!(
            intrinsic::render(&arns[0]),
            "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSGlueServiceRole"
        );
    }

    #[test]
    fn test_default_policy_attaches_to_role() {
        let policy = Policy {
            role_id: "my_glue_role".into(),
            role: glue_role().logical_id(),
            statements: vec![BucketGrant::Read.statement("Scripts")],
        };
        assert_eq!(policy.id(), "my_glue_role/DefaultPolicy");
        let props = policy.properties();
        assert_eq!(props["Roles"][0], intrinsic::reference(&glue_role().logical_id()));
        assert_eq!(props["PolicyName"], json!(policy.logical_id()));
        assert_eq!(props["PolicyDocument"]["Statement"].as_array().unwrap().len(), 1);
    }
}
