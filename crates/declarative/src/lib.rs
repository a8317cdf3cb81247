//! # Declarative
//!
//! A framework for declaring cloud resource graphs.
//!
//! This crate provides the core abstractions for declaring resources,
//! wiring references between them by logical name, and synthesizing the
//! resulting graph into a provisioning template.
//!
//! ## Core Concepts
//!
//! - **Resource**: A single provisionable thing (bucket, role, job, trigger)
//! - **Intrinsic**: A deploy-time expression (`Ref`, `Fn::GetAtt`, `Fn::Join`)
//! - **ResourceGraph**: Resources plus template parameters and outputs
//! - **Template**: The synthesized provisioning document
//! - **ResourceDiff**: What changes between two synthesized templates
//!
//! ## Example
//!
//! ```
//! use declarative::{Resource, ResourceGraph, Template, intrinsic};
//! use serde_json::{Map, Value, json};
//!
//! #[derive(Debug)]
//! struct Queue { name: String }
//!
//! impl Resource for Queue {
//!     fn id(&self) -> String { self.name.clone() }
//!     fn description(&self) -> String { format!("Queue {}", self.name) }
//!     fn resource_type(&self) -> &'static str { "AWS::SQS::Queue" }
//!     fn properties(&self) -> Map<String, Value> {
//!         let mut props = Map::new();
//!         props.insert("QueueName".into(), json!(self.name));
//!         props
//!     }
//! }
//!
//! let mut graph = ResourceGraph::new();
//! let queue = graph.insert(Box::new(Queue { name: "jobs".into() }))?;
//! graph.add_output("QueueUrl", "Queue URL", intrinsic::reference(&queue));
//!
//! let template = Template::synthesize(&graph, Some("Example"))?;
//! assert_eq!(template.count_of_type("AWS::SQS::Queue"), 1);
//! # Ok::<(), declarative::Error>(())
//! ```

pub mod diff;
pub mod error;
pub mod graph;
pub mod intrinsic;
pub mod resource;
pub mod template;
pub mod types;

// Re-export main types at crate root
pub use diff::{DiffSummary, ResourceDiff, diff_templates, group_by_type};
pub use error::{Error, Result};
pub use graph::{OutputSpec, ParameterSpec, ResourceGraph};
pub use intrinsic::{Pseudo, Reference};
pub use resource::{BoxedResource, Resource, ResourceExt, logical_id};
pub use template::{Template, TemplateResource};
pub use types::{RemovalPolicy, ResourceState};
