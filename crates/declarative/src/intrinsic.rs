//! Intrinsic expressions resolved by the provisioning engine at deploy time
//!
//! Cross-resource wiring never uses physical names. A resource refers to
//! another by logical ID through `Ref` / `Fn::GetAtt`, and composite strings
//! (ARNs, S3 URLs) are assembled with `Fn::Join`.

use serde_json::{Value, json};
use std::fmt;

/// Pseudo parameters supplied by the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
    StackName,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::Partition => "AWS::Partition",
            Self::StackName => "AWS::StackName",
            Self::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

impl fmt::Display for Pseudo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a `Ref` target names a pseudo parameter rather than a resource
pub fn is_pseudo(target: &str) -> bool {
    target.starts_with("AWS::")
}

/// `{"Ref": logical_id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Ref": "AWS::..."}`
pub fn pseudo(param: Pseudo) -> Value {
    json!({ "Ref": param.as_str() })
}

/// `{"Fn::GetAtt": [logical_id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Join": [delimiter, parts]}`
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// ARN of an AWS managed IAM policy, e.g. `service-role/AWSGlueServiceRole`
pub fn managed_policy_arn(name: &str) -> Value {
    join(
        "",
        vec![
            json!("arn:"),
            pseudo(Pseudo::Partition),
            json!(format!(":iam::aws:policy/{name}")),
        ],
    )
}

/// How one value points at another declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `Ref` to a resource or parameter
    Ref(String),
    /// `Fn::GetAtt` of a resource attribute
    GetAtt { target: String, attribute: String },
}

impl Reference {
    /// Logical ID or parameter name being referenced
    pub fn target(&self) -> &str {
        match self {
            Self::Ref(target) | Self::GetAtt { target, .. } => target,
        }
    }
}

/// Collect every non-pseudo reference inside a value, depth first
pub fn references(value: &Value) -> Vec<Reference> {
    let mut found = Vec::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut Vec<Reference>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !is_pseudo(target) {
                        found.push(Reference::Ref(target.clone()));
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt")
                    && let [Value::String(target), Value::String(attribute)] = args.as_slice()
                {
                    found.push(Reference::GetAtt {
                        target: target.clone(),
                        attribute: attribute.clone(),
                    });
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found);
            }
        }
        _ => {}
    }
}

/// The target of a bare `{"Ref": ...}`, if that is what the value is
pub fn as_reference(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("Ref")?.as_str()
}

/// Render a value as a human-readable string with `${...}` placeholders
///
/// `{"Fn::Join": ["", ["s3://", {"Ref": "Bucket"}, "/key"]]}` renders as
/// `s3://${Bucket}/key`.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) if map.len() == 1 => {
            if let Some(Value::String(target)) = map.get("Ref") {
                return format!("${{{target}}}");
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt")
                && let [Value::String(target), Value::String(attribute)] = args.as_slice()
            {
                return format!("${{{target}.{attribute}}}");
            }
            if let Some(Value::Array(args)) = map.get("Fn::Join")
                && let [Value::String(delimiter), Value::Array(parts)] = args.as_slice()
            {
                return parts
                    .iter()
                    .map(render)
                    .collect::<Vec<_>>()
                    .join(delimiter);
            }
            value.to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_skip_pseudo_parameters() {
        let value = join(
            "",
            vec![
                json!("arn:"),
                pseudo(Pseudo::Partition),
                json!(":s3:::"),
                reference("DataBucket"),
            ],
        );
        assert_eq!(references(&value), vec![Reference::Ref("DataBucket".into())]);
    }

    #[test]
    fn test_references_find_nested_get_att() {
        let value = json!({
            "Role": get_att("GlueRole", "Arn"),
            "DefaultArguments": { "--my_bucket": reference("DataBucket") },
        });
        let found = references(&value);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&Reference::GetAtt {
            target: "GlueRole".into(),
            attribute: "Arn".into()
        }));
        assert!(found.iter().any(|r| r.target() == "DataBucket"));
    }

    #[test]
    fn test_render_join() {
        let value = join(
            "",
            vec![json!("s3://"), reference("Scripts"), json!("/assets/a.py")],
        );
        assert_eq!(render(&value), "s3://${Scripts}/assets/a.py");
        assert_eq!(render(&get_att("Role", "Arn")), "${Role.Arn}");
    }

    #[test]
    fn test_managed_policy_arn() {
        let value = managed_policy_arn("service-role/AWSGlueServiceRole");
        assert_eq!(
            render(&value),
            "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSGlueServiceRole"
        );
        assert!(references(&value).is_empty());
    }

    #[test]
    fn test_as_reference() {
        assert_eq!(as_reference(&reference("Workflow")), Some("Workflow"));
        assert_eq!(as_reference(&json!("Workflow")), None);
    }
}
