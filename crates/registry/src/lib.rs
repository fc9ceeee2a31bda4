//! Registry crate for API implementations and their configuration.
//!
//! This crate owns the capability registry (which implementation types exist
//! and which of their operations are invocable) and the loader for the
//! API → environment → tenant configuration tree.

pub mod capability;
pub mod config;
pub mod errors;
pub mod instance;

pub use automation_types::{ApiDescriptor, ConfigTree, ImplementationLocator, OperationDescriptor};
pub use capability::{ApiHandle, ApiImplementation, ApiRegistration, CapabilityRegistry, OperationArguments, PendingInstance};
pub use errors::{ConfigLoadError, RegistryError, ResolutionError};
pub use instance::ApiInstance;
