//! API implementations bundled with the Automation Engine.
//!
//! Each implementation declares itself through the public registration
//! interface of `automation-registry`; [`register_builtin_apis`] runs every
//! declaration once at startup.
//!
//! # Example
//!
//! ```ignore
//! use automation_registry::CapabilityRegistry;
//!
//! let mut registry = CapabilityRegistry::new();
//! automation_api::register_builtin_apis(&mut registry);
//! let handle = registry.resolve("ExampleApi")?;
//! println!("{} operations", handle.operations().len());
//! ```

pub mod client;
pub mod example;
pub mod loopback;

use automation_registry::CapabilityRegistry;

pub use client::HttpApiClient;
pub use example::ExampleApi;
pub use loopback::LoopbackApi;

/// Declares every bundled implementation in `registry`.
pub fn register_builtin_apis(registry: &mut CapabilityRegistry) {
    example::register(registry);
    loopback::register(registry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_apis_are_registered_with_modules() {
        let mut registry = CapabilityRegistry::new();
        register_builtin_apis(&mut registry);
        assert_eq!(registry.api_names(), vec![example::EXAMPLE_API_NAME, loopback::LOOPBACK_API_NAME]);
        let handle = registry.resolve(loopback::LOOPBACK_API_NAME).unwrap();
        assert_eq!(handle.module(), Some(loopback::LOOPBACK_API_MODULE));
    }
}
