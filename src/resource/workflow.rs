//! Workflow grouping the pipeline's triggers

use serde_json::{Map, Value, json};

use super::{Resource, types};
use crate::schema::WorkflowConfig;

#[derive(Debug, Clone)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Workflow {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
        }
    }
}

impl Resource for Workflow {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn resource_type(&self) -> &'static str {
        types::WORKFLOW
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("Description".into(), json!(self.description));
        props.insert("Name".into(), json!(self.name));
        props
    }
}
