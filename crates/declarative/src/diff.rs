//! Diff computation between two synthesized templates

use crate::template::{Template, TemplateResource};
use crate::types::ResourceState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A difference in one resource between two templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Logical ID of the resource
    pub logical_id: String,
    /// Type of the resource (the new type when replaced)
    pub resource_type: String,
    /// State in the deployed (old) template
    pub current: ResourceState,
    /// State in the freshly synthesized (new) template
    pub desired: ResourceState,
    /// Top-level attributes whose values differ
    pub changed: Vec<String>,
    /// Old properties document, when the resource existed
    pub before: Option<Value>,
    /// New properties document, when the resource still exists
    pub after: Option<Value>,
}

impl ResourceDiff {
    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(self.desired, ResourceState::Modified { .. })
    }

    /// A type change forces the engine to replace the resource
    pub fn is_replacement(&self) -> bool {
        matches!(&self.desired, ResourceState::Modified { from, to } if from != to)
    }
}

/// Compare two templates resource by resource
///
/// Returns only resources that differ, ordered by logical ID.
pub fn diff_templates(old: &Template, new: &Template) -> Vec<ResourceDiff> {
    let ids: BTreeSet<&String> = old.resources.keys().chain(new.resources.keys()).collect();

    ids.into_iter()
        .filter_map(|id| {
            match (old.resources.get(id), new.resources.get(id)) {
                (None, Some(added)) => Some(ResourceDiff {
                    logical_id: id.clone(),
                    resource_type: added.resource_type.clone(),
                    current: ResourceState::Absent,
                    desired: ResourceState::Present {
                        details: Some(added.resource_type.clone()),
                    },
                    changed: Vec::new(),
                    before: None,
                    after: Some(Value::Object(added.properties.clone())),
                }),
                (Some(removed), None) => Some(ResourceDiff {
                    logical_id: id.clone(),
                    resource_type: removed.resource_type.clone(),
                    current: ResourceState::Present {
                        details: Some(removed.resource_type.clone()),
                    },
                    desired: ResourceState::Absent,
                    changed: Vec::new(),
                    before: Some(Value::Object(removed.properties.clone())),
                    after: None,
                }),
                (Some(before), Some(after)) => {
                    let changed = changed_attributes(before, after);
                    if changed.is_empty() {
                        return None;
                    }
                    Some(ResourceDiff {
                        logical_id: id.clone(),
                        resource_type: after.resource_type.clone(),
                        current: ResourceState::Present {
                            details: Some(before.resource_type.clone()),
                        },
                        desired: ResourceState::Modified {
                            from: before.resource_type.clone(),
                            to: after.resource_type.clone(),
                        },
                        changed,
                        before: Some(Value::Object(before.properties.clone())),
                        after: Some(Value::Object(after.properties.clone())),
                    })
                }
                (None, None) => None,
            }
        })
        .collect()
}

/// Names of properties (and resource attributes) that differ
fn changed_attributes(before: &TemplateResource, after: &TemplateResource) -> Vec<String> {
    let mut changed = Vec::new();

    if before.resource_type != after.resource_type {
        changed.push("Type".to_string());
    }

    let keys: BTreeSet<&String> = before
        .properties
        .keys()
        .chain(after.properties.keys())
        .collect();
    for key in keys {
        if before.properties.get(key) != after.properties.get(key) {
            changed.push(key.clone());
        }
    }

    if before.depends_on != after.depends_on {
        changed.push("DependsOn".to_string());
    }
    if before.deletion_policy != after.deletion_policy {
        changed.push("DeletionPolicy".to_string());
    }
    if before.update_replace_policy != after.update_replace_policy {
        changed.push("UpdateReplacePolicy".to_string());
    }

    changed
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of modifications that replace the resource
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
            if diff.is_replacement() {
                summary.replacements += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn resource(resource_type: &str, props: Value) -> TemplateResource {
        TemplateResource {
            resource_type: resource_type.to_string(),
            properties: props.as_object().cloned().unwrap_or_else(Map::new),
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    fn template(entries: Vec<(&str, TemplateResource)>) -> Template {
        Template {
            format_version: crate::template::FORMAT_VERSION.to_string(),
            description: None,
            parameters: BTreeMap::new(),
            resources: entries
                .into_iter()
                .map(|(id, r)| (id.to_string(), r))
                .collect(),
            outputs: BTreeMap::new(),
        }
    }

    #[test]
    fn test_identical_templates_have_no_diff() {
        let t = template(vec![("Job", resource("AWS::Glue::Job", json!({"Timeout": 3})))]);
        assert!(diff_templates(&t, &t.clone()).is_empty());
    }

    #[test]
    fn test_add_remove_modify() {
        let old = template(vec![
            ("Job", resource("AWS::Glue::Job", json!({"Timeout": 3}))),
            ("Gone", resource("AWS::Glue::Trigger", json!({}))),
        ]);
        let new = template(vec![
            ("Job", resource("AWS::Glue::Job", json!({"Timeout": 10}))),
            ("Crawler", resource("AWS::Glue::Crawler", json!({}))),
        ]);

        let diffs = diff_templates(&old, &new);
        assert_eq!(diffs.len(), 3);

        let crawler = diffs.iter().find(|d| d.logical_id == "Crawler").unwrap();
        assert!(crawler.is_addition());

        let gone = diffs.iter().find(|d| d.logical_id == "Gone").unwrap();
        assert!(gone.is_removal());

        let job = diffs.iter().find(|d| d.logical_id == "Job").unwrap();
        assert!(job.is_modification());
        assert!(!job.is_replacement());
        assert_eq!(job.changed, vec!["Timeout".to_string()]);

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(
            (summary.additions, summary.removals, summary.modifications),
            (1, 1, 1)
        );
        assert!(summary.has_changes());
    }

    #[test]
    fn test_type_change_is_replacement() {
        let old = template(vec![("X", resource("AWS::Glue::Job", json!({})))]);
        let new = template(vec![("X", resource("AWS::Glue::Crawler", json!({})))]);
        let diffs = diff_templates(&old, &new);
        assert_eq!(diffs[0].changed, vec!["Type".to_string()]);
        assert!(diffs[0].is_replacement());
        assert_eq!(DiffSummary::from_diffs(&diffs).replacements, 1);
    }

    #[test]
    fn test_dependency_change_detected() {
        let old = template(vec![("T", resource("AWS::Glue::Trigger", json!({})))]);
        let mut changed = resource("AWS::Glue::Trigger", json!({}));
        changed.depends_on = vec!["Job".into()];
        let new = template(vec![("T", changed)]);
        assert_eq!(diff_templates(&old, &new)[0].changed, vec!["DependsOn".to_string()]);
    }

    #[test]
    fn test_group_by_type() {
        let old = template(vec![]);
        let new = template(vec![
            ("A", resource("AWS::Glue::Job", json!({}))),
            ("B", resource("AWS::Glue::Job", json!({}))),
            ("C", resource("AWS::S3::Bucket", json!({}))),
        ]);
        let diffs = diff_templates(&old, &new);
        let groups = group_by_type(&diffs);
        assert_eq!(groups["AWS::Glue::Job"].len(), 2);
        assert_eq!(groups["AWS::S3::Bucket"].len(), 1);
    }
}
