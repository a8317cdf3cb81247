//! Template synthesis - renders a resource graph into a provisioning document

use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::types::RemovalPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Template format version understood by the provisioning engine
pub const FORMAT_VERSION: &str = "2010-09-09";

/// One entry of the `Resources` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
}

impl TemplateResource {
    /// Property by name
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// String property by name
    pub fn str_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Removal policy, if the resource declares one
    pub fn removal_policy(&self) -> Option<RemovalPolicy> {
        self.deletion_policy
            .as_deref()
            .and_then(RemovalPolicy::from_template_value)
    }
}

/// One entry of the `Parameters` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateParameter {
    #[serde(rename = "Type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// One entry of the `Outputs` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub value: Value,
}

/// A synthesized provisioning document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, TemplateParameter>,
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Template {
    /// A template with no resources, the baseline for a first diff
    pub fn empty() -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: None,
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Render a graph into a template
    ///
    /// Fails if any reference dangles or the dependency graph has a cycle;
    /// a template that passes here is structurally deployable.
    ///
    /// `ordered` is only a cycle check here. `Resources` is keyed by logical
    /// ID and renders sorted by it, not in insertion or dependency order.
    pub fn synthesize(graph: &ResourceGraph, description: Option<&str>) -> Result<Self> {
        graph.check_references()?;
        graph.ordered()?;

        let mut resources = BTreeMap::new();
        for resource in graph.resources() {
            let policy = resource
                .removal_policy()
                .map(|p| p.as_template_value().to_string());
            resources.insert(
                resource.logical_id(),
                TemplateResource {
                    resource_type: resource.resource_type().to_string(),
                    properties: resource.properties(),
                    depends_on: resource.depends_on(),
                    deletion_policy: policy.clone(),
                    update_replace_policy: policy,
                },
            );
        }

        let parameters = graph
            .parameters
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    TemplateParameter {
                        param_type: spec.param_type.clone(),
                        description: spec.description.clone(),
                        default: spec.default.clone(),
                    },
                )
            })
            .collect();

        let outputs = graph
            .outputs
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    TemplateOutput {
                        description: spec.description.clone(),
                        value: spec.value.clone(),
                    },
                )
            })
            .collect();

        log::debug!("synthesized template with {} resources", resources.len());

        Ok(Self {
            format_version: FORMAT_VERSION.to_string(),
            description: description.map(ToString::to_string),
            parameters,
            resources,
            outputs,
        })
    }

    /// Parse a template document
    pub fn from_json(content: &str) -> Result<Self> {
        let template: Self = serde_json::from_str(content)?;
        if template.format_version != FORMAT_VERSION {
            return Err(Error::InvalidTemplate(format!(
                "unsupported format version '{}'",
                template.format_version
            )));
        }
        Ok(template)
    }

    /// Pretty-printed JSON with a trailing newline
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Resources of one type as (logical ID, resource) pairs
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TemplateResource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Number of resources of one type
    pub fn count_of_type(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).count()
    }

    /// Resource counts keyed by type
    pub fn type_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for resource in self.resources.values() {
            *counts.entry(resource.resource_type.as_str()).or_insert(0) += 1;
        }
        counts
    }
}
