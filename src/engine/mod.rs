//! Synthesis engine for gluestack
//!
//! The engine orchestrates:
//! 1. Planning - Build the resource graph from the declaration
//! 2. Validating - Structural checks and lints over the synthesized template
//! 3. Synthesizing - Write the template and staged assets to disk
//! 4. Diffing - Compare a fresh synthesis with a previous one

pub mod differ;
pub mod planner;
pub mod synth;
pub mod validate;

pub use planner::build_stack;
pub use validate::{Report, Severity, validate};

use thiserror::Error;

/// Failures while building the resource graph from a declaration
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Job '{job}' is declared before role '{role}' was granted {missing}")]
    RoleNotGranted {
        job: String,
        role: String,
        missing: String,
    },

    #[error("Trigger '{trigger}' names undeclared job '{job}'")]
    UnknownJob { trigger: String, job: String },

    #[error("Job '{job}' runs '{script}', which is not in the asset directory")]
    MissingScript { job: String, script: String },

    #[error("Invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("Cannot declare {step} before the {requires}")]
    OutOfOrder {
        step: &'static str,
        requires: &'static str,
    },

    #[error(transparent)]
    Graph(#[from] declarative::Error),
}
