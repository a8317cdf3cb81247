//! Error types for the declarative crate

use thiserror::Error;

/// Errors raised while assembling or synthesizing a resource graph
#[derive(Error, Debug)]
pub enum Error {
    /// Two resources resolved to the same logical ID
    #[error("duplicate logical ID '{logical_id}' (construct '{id}')")]
    DuplicateLogicalId {
        /// The colliding logical ID
        logical_id: String,
        /// Construct id of the resource that was rejected
        id: String,
    },

    /// A reference points at something that is not declared
    #[error("resource '{from}' references unknown target '{target}'")]
    DanglingReference {
        /// Logical ID (or output name) holding the reference
        from: String,
        /// The missing target
        target: String,
    },

    /// The dependency graph has a cycle
    #[error("dependency cycle between resources: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// A document could not be interpreted as a template
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Logical IDs involved in the error, if any
    pub fn logical_ids(&self) -> Vec<&str> {
        match self {
            Self::DuplicateLogicalId { logical_id, .. } => vec![logical_id.as_str()],
            Self::DanglingReference { from, .. } => vec![from.as_str()],
            Self::Cycle(ids) => ids.iter().map(String::as_str).collect(),
            Self::InvalidTemplate(_) | Self::Serialize(_) => Vec::new(),
        }
    }
}

/// Result type for declarative operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_members() {
        let err = Error::Cycle(vec!["A".into(), "B".into()]);
        assert_eq!(err.to_string(), "dependency cycle between resources: A, B");
        assert_eq!(err.logical_ids(), vec!["A", "B"]);
    }

    #[test]
    fn test_dangling_reference_message() {
        let err = Error::DanglingReference {
            from: "JobA".into(),
            target: "MissingRole".into(),
        };
        assert!(err.to_string().contains("MissingRole"));
        assert_eq!(err.logical_ids(), vec!["JobA"]);
    }
}
