//! Resource trait for declarative resource graphs
//!
//! A Resource is one entry of the provisioning document: a typed,
//! property-bearing declaration that can refer to other resources by
//! logical ID.

use crate::intrinsic::{self, Reference};
use crate::types::RemovalPolicy;
use serde_json::{Map, Value};
use std::fmt;

/// Core trait for declared resources
///
/// Every resource in a graph implements this trait, which provides:
/// - Identity (construct id, logical id, type)
/// - The property document rendered into the template
/// - Explicit ordering dependencies and removal behavior
///
/// # Example
///
/// ```
/// use declarative::Resource;
/// use serde_json::{Map, Value, json};
///
/// #[derive(Debug)]
/// struct Topic {
///     name: String,
/// }
///
/// impl Resource for Topic {
///     fn id(&self) -> String {
///         self.name.clone()
///     }
///
///     fn description(&self) -> String {
///         format!("Notification topic {}", self.name)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "AWS::SNS::Topic"
///     }
///
///     fn properties(&self) -> Map<String, Value> {
///         let mut props = Map::new();
///         props.insert("TopicName".into(), json!(self.name));
///         props
///     }
/// }
///
/// let topic = Topic { name: "alerts".into() };
/// assert!(topic.logical_id().starts_with("Alerts"));
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Construct path of this resource within the stack
    ///
    /// Nested constructs use `/` separators. Examples:
    /// - "final_data" for a bucket
    /// - "final_data/Policy" for that bucket's policy
    /// - "my_glue_role/DefaultPolicy" for a role's inline grants
    fn id(&self) -> String;

    /// Human-readable description of what this resource is for
    fn description(&self) -> String;

    /// Provisioning type, e.g. "AWS::Glue::Job"
    fn resource_type(&self) -> &'static str;

    /// Key under which this resource appears in the template
    ///
    /// Derived from the construct path by default; override only when a
    /// stable hand-picked identifier is required.
    fn logical_id(&self) -> String {
        logical_id(&self.id())
    }

    /// Property document for the template
    fn properties(&self) -> Map<String, Value>;

    /// Logical IDs that must be created before this resource even though
    /// no property references them
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Deletion and replacement behavior, if not the engine default
    fn removal_policy(&self) -> Option<RemovalPolicy> {
        None
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for inspecting resources
pub trait ResourceExt {
    /// References found in the property document
    fn references(&self) -> Vec<Reference>;

    /// Every logical ID this resource must follow, deduplicated
    fn dependencies(&self) -> Vec<String>;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn references(&self) -> Vec<Reference> {
        intrinsic::references(&Value::Object(self.properties()))
    }

    fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        let referenced = self.references().into_iter().map(|r| r.target().to_string());
        for dep in referenced.chain(self.depends_on()) {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }
}

/// Derive a logical ID from a construct path
///
/// The readable part is the PascalCase of every path segment with
/// non-alphanumerics dropped; an 8-digit hash of the full path keeps IDs
/// unique when two paths collapse to the same readable text.
pub fn logical_id(path: &str) -> String {
    let mut readable = String::new();
    for segment in path.split('/') {
        for word in segment.split(|c: char| !c.is_ascii_alphanumeric()) {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                readable.push(first.to_ascii_uppercase());
                readable.extend(chars);
            }
        }
    }
    let hash = blake3::hash(path.as_bytes()).to_hex();
    format!("{readable}{}", hash.as_str()[..8].to_ascii_uppercase())
}
