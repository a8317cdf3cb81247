//! Core types for declarative resource graphs

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to a resource when it leaves the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Delete the resource (and, for stores, its contents)
    Destroy,
    /// Orphan the resource in the account
    #[default]
    Retain,
    /// Snapshot before deleting (databases, volumes)
    Snapshot,
}

impl RemovalPolicy {
    /// Template literal for `DeletionPolicy` / `UpdateReplacePolicy`
    pub fn as_template_value(&self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }

    /// Parse a template literal back into a policy
    pub fn from_template_value(value: &str) -> Option<Self> {
        match value {
            "Delete" => Some(Self::Destroy),
            "Retain" => Some(Self::Retain),
            "Snapshot" => Some(Self::Snapshot),
            _ => None,
        }
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroy => write!(f, "destroy"),
            Self::Retain => write!(f, "retain"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// State of a resource in one template relative to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource is declared
    Present { details: Option<String> },
    /// Resource is not declared
    Absent,
    /// Resource is declared in both but differs
    Modified { from: String, to: String },
}

impl ResourceState {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_policy_template_values() {
        for policy in [
            RemovalPolicy::Destroy,
            RemovalPolicy::Retain,
            RemovalPolicy::Snapshot,
        ] {
            assert_eq!(
                RemovalPolicy::from_template_value(policy.as_template_value()),
                Some(policy)
            );
        }
        assert_eq!(RemovalPolicy::Destroy.as_template_value(), "Delete");
        assert_eq!(RemovalPolicy::from_template_value("delete"), None);
    }

    #[test]
    fn test_removal_policy_serde_lowercase() {
        let policy: RemovalPolicy = serde_json::from_str("\"destroy\"").unwrap();
        assert_eq!(policy, RemovalPolicy::Destroy);
    }
}
