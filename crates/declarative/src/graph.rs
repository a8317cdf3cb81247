//! Resource graph - the in-memory declaration a template is synthesized from

use crate::error::{Error, Result};
use crate::intrinsic;
use crate::resource::{BoxedResource, Resource, ResourceExt};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A template input parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter type, e.g. "String"
    pub param_type: String,
    pub description: String,
    pub default: Option<String>,
}

/// A template output
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub description: String,
    pub value: Value,
}

/// Resources plus the parameters and outputs that frame them
///
/// Resources keep insertion order, which is also the tie-breaker when
/// computing dependency order.
#[derive(Debug)]
pub struct ResourceGraph {
    resources: Vec<BoxedResource>,
    index: HashMap<String, usize>,
    /// Parameters by name
    pub parameters: BTreeMap<String, ParameterSpec>,
    /// Outputs by name
    pub outputs: BTreeMap<String, OutputSpec>,
}

impl ResourceGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            index: HashMap::new(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Add a resource, returning its logical ID
    pub fn insert(&mut self, resource: BoxedResource) -> Result<String> {
        let logical_id = resource.logical_id();
        if self.index.contains_key(&logical_id) || self.parameters.contains_key(&logical_id) {
            return Err(Error::DuplicateLogicalId {
                logical_id,
                id: resource.id(),
            });
        }
        log::trace!("declare {} {}", resource.resource_type(), logical_id);
        self.index.insert(logical_id.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(logical_id)
    }

    /// Declare a string parameter, returning its name for `Ref`
    pub fn add_parameter(&mut self, name: &str, description: &str) -> String {
        self.parameters.insert(
            name.to_string(),
            ParameterSpec {
                param_type: "String".to_string(),
                description: description.to_string(),
                default: None,
            },
        );
        name.to_string()
    }

    /// Declare an output
    pub fn add_output(&mut self, name: &str, description: &str, value: Value) {
        self.outputs.insert(
            name.to_string(),
            OutputSpec {
                description: description.to_string(),
                value,
            },
        );
    }

    /// Look up a resource by logical ID
    pub fn get(&self, logical_id: &str) -> Option<&dyn Resource> {
        self.index
            .get(logical_id)
            .map(|&i| self.resources[i].as_ref())
    }

    /// Check whether a logical ID is declared
    pub fn contains(&self, logical_id: &str) -> bool {
        self.index.contains_key(logical_id)
    }

    /// Resources in insertion order
    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.iter().map(AsRef::as_ref)
    }

    /// Resources of one provisioning type, in insertion order
    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a dyn Resource> {
        self.resources()
            .filter(move |r| r.resource_type() == resource_type)
    }

    /// Total number of resources in the graph
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Verify every reference and explicit dependency resolves
    pub fn check_references(&self) -> Result<()> {
        for resource in self.resources() {
            for target in resource.dependencies() {
                if !self.contains(&target) && !self.parameters.contains_key(&target) {
                    return Err(Error::DanglingReference {
                        from: resource.logical_id(),
                        target,
                    });
                }
            }
        }

        for (name, output) in &self.outputs {
            for reference in intrinsic::references(&output.value) {
                let target = reference.target();
                if !self.contains(target) && !self.parameters.contains_key(target) {
                    return Err(Error::DanglingReference {
                        from: name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Resources in dependency order
    ///
    /// Kahn's algorithm; among resources whose dependencies are satisfied
    /// the earliest-inserted goes first, so the order is deterministic.
    /// Parameter references do not constrain ordering.
    pub fn ordered(&self) -> Result<Vec<&dyn Resource>> {
        let count = self.resources.len();
        let mut pending: Vec<usize> = vec![0; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (i, resource) in self.resources.iter().enumerate() {
            for dep in resource.dependencies() {
                if let Some(&j) = self.index.get(&dep) {
                    pending[i] += 1;
                    dependents[j].push(i);
                }
            }
        }

        let mut ready: Vec<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while !ready.is_empty() {
            // Smallest index first keeps insertion order among peers
            ready.sort_unstable_by(|a, b| b.cmp(a));
            let Some(next) = ready.pop() else { break };
            order.push(next);
            for &dependent in &dependents[next] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }

        if order.len() < count {
            let placed: HashSet<usize> = order.iter().copied().collect();
            let stuck = (0..count)
                .filter(|i| !placed.contains(i))
                .map(|i| self.resources[i].logical_id())
                .collect();
            return Err(Error::Cycle(stuck));
        }

        Ok(order.into_iter().map(|i| self.resources[i].as_ref()).collect())
    }

    /// Filter graph to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name", where type is the last segment
    /// of the provisioning type in lowercase ("bucket", "job", "trigger")
    /// and name is matched against the construct id.
    pub fn filter_by_target(&self, target: Option<&str>) -> Vec<&dyn Resource> {
        match target {
            None => self.resources().collect(),
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.resources()
                    .filter(|r| matches_filter(*r, resource_type.as_deref(), name.as_deref()))
                    .collect()
            }
        }
    }
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        let short = resource
            .resource_type()
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        // Allow common aliases
        let matches_type = match rt {
            "buckets" | "s3" => resource.resource_type().starts_with("AWS::S3::"),
            "iam" => resource.resource_type().starts_with("AWS::IAM::"),
            "glue" => resource.resource_type().starts_with("AWS::Glue::"),
            "jobs" => short == "job",
            "triggers" => short == "trigger",
            _ => short == rt || resource.resource_type() == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    #[derive(Debug)]
    struct Node {
        id: &'static str,
        kind: &'static str,
        refs: Vec<String>,
    }

    impl Resource for Node {
        fn id(&self) -> String {
            self.id.to_string()
        }
        fn description(&self) -> String {
            format!("node {}", self.id)
        }
        fn resource_type(&self) -> &'static str {
            self.kind
        }
        fn properties(&self) -> Map<String, Value> {
            let mut props = Map::new();
            let refs: Vec<Value> = self.refs.iter().map(|r| intrinsic::reference(r)).collect();
            props.insert("Refs".into(), json!(refs));
            props
        }
    }

    fn node(id: &'static str, kind: &'static str, refs: &[&str]) -> BoxedResource {
        Box::new(Node {
            id,
            kind,
            refs: refs.iter().map(ToString::to_string).collect(),
        })
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("job"), (Some("job".to_string()), None));
        assert_eq!(
            parse_target("job.download"),
            (Some("job".to_string()), Some("download".to_string()))
        );
        assert_eq!(parse_target("a.b.c"), (None, Some("a.b.c".to_string())));
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut graph = ResourceGraph::new();
        graph.insert(node("a", "Test::Node", &[])).unwrap();
        let err = graph.insert(node("a", "Test::Node", &[])).unwrap_err();
        assert!(matches!(err, Error::DuplicateLogicalId { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_ordered_respects_references_then_insertion() {
        let mut graph = ResourceGraph::new();
        let a = logical_id_of("a");
        graph.insert(node("b", "Test::Node", &[&a])).unwrap();
        graph.insert(node("c", "Test::Node", &[])).unwrap();
        graph.insert(node("a", "Test::Node", &[])).unwrap();

        let ids: Vec<String> = graph.ordered().unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_ordered_detects_cycles() {
        let mut graph = ResourceGraph::new();
        let a = logical_id_of("a");
        let b = logical_id_of("b");
        graph.insert(node("a", "Test::Node", &[&b])).unwrap();
        graph.insert(node("b", "Test::Node", &[&a])).unwrap();
        graph.insert(node("c", "Test::Node", &[])).unwrap();

        match graph.ordered() {
            Err(Error::Cycle(ids)) => {
                assert_eq!(ids.len(), 2);
                assert!(ids.contains(&a) && ids.contains(&b));
            }
            other => panic!("expected cycle, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_check_references() {
        let mut graph = ResourceGraph::new();
        graph.insert(node("a", "Test::Node", &["Missing"])).unwrap();
        assert!(matches!(
            graph.check_references(),
            Err(Error::DanglingReference { target, .. }) if target == "Missing"
        ));

        graph.add_parameter("Missing", "now declared");
        assert!(graph.check_references().is_ok());

        graph.add_output("Out", "bad", intrinsic::reference("Nope"));
        assert!(graph.check_references().is_err());
    }

    #[test]
    fn test_filter_by_target() {
        let mut graph = ResourceGraph::new();
        graph.insert(node("download", "AWS::Glue::Job", &[])).unwrap();
        graph.insert(node("merge", "AWS::Glue::Job", &[])).unwrap();
        graph.insert(node("initial", "AWS::Glue::Trigger", &[])).unwrap();
        graph.insert(node("data", "AWS::S3::Bucket", &[])).unwrap();

        assert_eq!(graph.filter_by_target(None).len(), 4);
        assert_eq!(graph.filter_by_target(Some("job")).len(), 2);
        assert_eq!(graph.filter_by_target(Some("jobs.merge")).len(), 1);
        assert_eq!(graph.filter_by_target(Some("glue")).len(), 3);
        assert_eq!(graph.filter_by_target(Some("s3")).len(), 1);
        assert_eq!(graph.of_type("AWS::Glue::Trigger").count(), 1);
    }

    fn logical_id_of(id: &str) -> String {
        crate::resource::logical_id(id)
    }
}
