//! Operation and API metadata surfaced by the capability registry.

use heck::ToTitleCase;
use serde::{Deserialize, Serialize};

/// Metadata for one operation an API implementation has marked invocable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Raw identifier used at registration time (e.g., `call_get_data`).
    pub id: String,
    /// Human-readable name shown in the catalog (e.g., `Call Get Data`).
    pub display_name: String,
    /// Optional one-line description.
    #[serde(default)]
    pub summary: Option<String>,
}

impl OperationDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let display_name = display_name_for(&id);
        Self {
            id,
            display_name,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Derives the catalog display name from an operation identifier.
///
/// Separators are replaced with spaces and each word is title-cased, so
/// `call_get_data` becomes `Call Get Data`.
pub fn display_name_for(identifier: &str) -> String {
    identifier.to_title_case()
}

/// Describes one registered API implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
    /// Unique registration name; matches the `class` field of a configuration binding.
    pub name: String,
    /// Module the implementation declared itself under, if any.
    #[serde(default)]
    pub module: Option<String>,
    /// Rust type name of the implementation, for diagnostics.
    pub type_name: String,
    /// Marked operations in declaration order.
    pub operations: Vec<OperationDescriptor>,
}
