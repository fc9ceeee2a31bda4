use std::{any::Any, fmt, sync::Arc};

use automation_types::OperationDescriptor;
use serde_json::Value;
use tracing::debug;

use crate::{
    capability::{InvokeFailure, OperationArguments, OperationTable},
    errors::RegistryError,
};

pub(crate) type ErasedInstance = Box<dyn Any + Send + Sync>;

/// A constructed API implementation together with its marked operations.
pub struct ApiInstance {
    api_name: String,
    instance: ErasedInstance,
    operations: Arc<OperationTable>,
}

impl fmt::Debug for ApiInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiInstance")
            .field("api_name", &self.api_name)
            .field("type_name", &self.operations.type_name)
            .finish()
    }
}

impl ApiInstance {
    pub(crate) fn new(api_name: String, instance: ErasedInstance, operations: Arc<OperationTable>) -> Self {
        Self {
            api_name,
            instance,
            operations,
        }
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn type_name(&self) -> &'static str {
        self.operations.type_name
    }

    pub fn operations(&self) -> Vec<OperationDescriptor> {
        self.operations.descriptors()
    }

    /// Typed access to the underlying implementation.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    /// Invokes a marked operation by identifier.
    pub fn invoke(&self, operation_id: &str, arguments: &OperationArguments) -> Result<Value, RegistryError> {
        let marked = self
            .operations
            .operations
            .get(operation_id)
            .ok_or_else(|| RegistryError::unknown_operation(&self.api_name, operation_id))?;
        debug!(api = %self.api_name, operation = %operation_id, "invoking operation");
        (marked.invoker)(self.instance.as_ref(), arguments).map_err(|failure| match failure {
            InvokeFailure::TypeMismatch => RegistryError::InstanceTypeMismatch {
                api: self.api_name.clone(),
                expected: self.operations.type_name.to_string(),
            },
            InvokeFailure::Failed(error) => RegistryError::OperationFailed {
                api: self.api_name.clone(),
                operation: operation_id.to_string(),
                reason: format!("{error:#}"),
            },
        })
    }
}
