//! Trigger resource - starts jobs or crawlers on a schedule or upstream state

use declarative::intrinsic;
use serde_json::{Map, Value, json};

use super::{Resource, types};
use crate::schema::JobRunState;

/// What a trigger starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    Job(String),
    Crawler(String),
}

impl TriggerAction {
    fn to_value(&self) -> Value {
        match self {
            Self::Job(name) => json!({ "JobName": name }),
            Self::Crawler(name) => json!({ "CrawlerName": name }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Job(name) | Self::Crawler(name) => name,
        }
    }
}

/// Upstream job reaching a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCondition {
    pub job: String,
    pub state: JobRunState,
}

impl TriggerCondition {
    fn to_value(&self) -> Value {
        json!({
            "JobName": self.job,
            "LogicalOperator": "EQUALS",
            "State": self.state.as_str(),
        })
    }
}

/// When a trigger fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSchedule {
    Cron(String),
    After(Vec<TriggerCondition>),
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub schedule: TriggerSchedule,
    pub actions: Vec<TriggerAction>,
    pub start_on_creation: bool,
    /// Logical ID of the owning workflow
    pub workflow: String,
    /// Logical IDs of the jobs and crawlers named by literal
    pub after: Vec<String>,
}

impl Trigger {
    pub fn type_literal(&self) -> &'static str {
        match self.schedule {
            TriggerSchedule::Cron(_) => "SCHEDULED",
            TriggerSchedule::After(_) => "CONDITIONAL",
        }
    }
}

impl Resource for Trigger {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        let targets: Vec<&str> = self.actions.iter().map(TriggerAction::name).collect();
        match &self.schedule {
            TriggerSchedule::Cron(cron) => format!("Start {} on {}", targets.join(", "), cron),
            TriggerSchedule::After(conditions) => {
                let upstream: Vec<String> = conditions
                    .iter()
                    .map(|c| format!("{} {}", c.job, c.state))
                    .collect();
                format!("Start {} after {}", targets.join(", "), upstream.join(", "))
            }
        }
    }

    fn resource_type(&self) -> &'static str {
        types::TRIGGER
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(
            "Actions".into(),
            Value::Array(self.actions.iter().map(TriggerAction::to_value).collect()),
        );
        props.insert("Name".into(), json!(self.name));
        match &self.schedule {
            TriggerSchedule::Cron(cron) => {
                props.insert("Schedule".into(), json!(cron));
            }
            TriggerSchedule::After(conditions) => {
                props.insert(
                    "Predicate".into(),
                    json!({
                        "Conditions": conditions.iter().map(TriggerCondition::to_value).collect::<Vec<_>>(),
                    }),
                );
            }
        }
        props.insert("StartOnCreation".into(), json!(self.start_on_creation));
        props.insert("Type".into(), json!(self.type_literal()));
        props.insert("WorkflowName".into(), intrinsic::reference(&self.workflow));
        props
    }

    fn depends_on(&self) -> Vec<String> {
        self.after.clone()
    }
}
