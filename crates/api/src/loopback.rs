//! In-process API that answers without touching the network.
//!
//! Useful for exercising the catalog and bindings offline.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use automation_registry::{ApiImplementation, CapabilityRegistry, OperationArguments};
use serde_json::{Value, json};

pub const LOOPBACK_API_NAME: &str = "LoopbackApi";
pub const LOOPBACK_API_MODULE: &str = "apis.loopback";

#[derive(Debug, Clone)]
pub struct LoopbackApi {
    started_at_ms: u128,
}

impl ApiImplementation for LoopbackApi {
    fn instantiate() -> Result<Self> {
        let started_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_millis())
            .unwrap_or_default();
        Ok(Self { started_at_ms })
    }
}

impl LoopbackApi {
    /// Returns the arguments unchanged.
    pub fn call_echo(&self, arguments: &OperationArguments) -> Result<Value> {
        Ok(Value::Object(arguments.clone()))
    }

    pub fn call_ping(&self, _arguments: &OperationArguments) -> Result<Value> {
        Ok(json!({ "status": "ok", "started_at_ms": self.started_at_ms.to_string() }))
    }
}

pub fn register(registry: &mut CapabilityRegistry) {
    registry
        .register_api::<LoopbackApi>(LOOPBACK_API_NAME)
        .in_module(LOOPBACK_API_MODULE)
        .described_operation("call_echo", "Return the arguments unchanged", LoopbackApi::call_echo)
        .described_operation("call_ping", "Report that the binding is alive", LoopbackApi::call_ping);
}
