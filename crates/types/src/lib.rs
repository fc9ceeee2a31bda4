//! Shared type definitions for the Automation Engine.
//!
//! These types are plain data: the configuration document model, operation
//! metadata surfaced in the catalog, and the identifiers of the three
//! selection levels. Behavior lives in the registry and engine crates.

use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod config;
pub mod operation;

pub use config::{ApiConfig, ConfigTree, EnvironmentConfig, ImplementationLocator};
pub use operation::{ApiDescriptor, OperationDescriptor, display_name_for};

/// One level of the API → Environment → Tenant selection chain.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CascadeLevel {
    Api,
    Environment,
    Tenant,
}

impl CascadeLevel {
    /// All levels, root first.
    pub const ALL: [CascadeLevel; 3] = [CascadeLevel::Api, CascadeLevel::Environment, CascadeLevel::Tenant];

    /// Levels strictly below this one, nearest first.
    pub fn descendants(self) -> impl Iterator<Item = CascadeLevel> {
        CascadeLevel::ALL.into_iter().filter(move |level| *level > self)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Environment => "environment",
            Self::Tenant => "tenant",
        }
    }
}

impl fmt::Display for CascadeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CascadeLevel {
    type Err = ParseCascadeLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "env" | "environment" => Ok(Self::Environment),
            "tenant" => Ok(Self::Tenant),
            _ => Err(ParseCascadeLevelError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCascadeLevelError;

impl fmt::Display for ParseCascadeLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected one of: api, env, tenant")
    }
}

impl Error for ParseCascadeLevelError {}
