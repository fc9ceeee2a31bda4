//! Capability registry: which API implementations exist and which of their
//! operations are invocable.
//!
//! Implementations are declared explicitly. An implementation type is
//! registered under a name with [`CapabilityRegistry::register_api`], and
//! each invocable operation is added with
//! [`CapabilityRegistry::mark_operation`], which stores an
//! [`OperationDescriptor`] next to the callable. Only marked operations are
//! ever listed or invocable.
//!
//! Operations are keyed by implementation type, so marking can happen before
//! or after the type is registered under a name, and a type registered under
//! several names shares one operation table.

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use automation_types::{ApiDescriptor, ConfigTree, ImplementationLocator, OperationDescriptor};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    errors::{RegistryError, ResolutionError},
    instance::{ApiInstance, ErasedInstance},
};

/// Named arguments passed to an operation.
pub type OperationArguments = serde_json::Map<String, Value>;

/// A type that can be registered as an API implementation.
///
/// `instantiate` is the zero-argument constructor invoked when the user syncs
/// to an API bound to this type. It may perform I/O and may fail.
pub trait ApiImplementation: Send + Sync + 'static {
    fn instantiate() -> anyhow::Result<Self>
    where
        Self: Sized;
}

pub(crate) type Factory = Arc<dyn Fn() -> anyhow::Result<ErasedInstance> + Send + Sync>;

pub(crate) enum InvokeFailure {
    TypeMismatch,
    Failed(anyhow::Error),
}

pub(crate) type Invoker = Arc<dyn Fn(&(dyn Any + Send + Sync), &OperationArguments) -> Result<Value, InvokeFailure> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct MarkedOperation {
    pub(crate) descriptor: OperationDescriptor,
    pub(crate) invoker: Invoker,
}

/// Marked operations of one implementation type, in declaration order.
#[derive(Clone)]
pub(crate) struct OperationTable {
    pub(crate) type_name: &'static str,
    pub(crate) operations: IndexMap<String, MarkedOperation>,
}

impl OperationTable {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            operations: IndexMap::new(),
        }
    }

    pub(crate) fn descriptors(&self) -> Vec<OperationDescriptor> {
        self.operations.values().map(|marked| marked.descriptor.clone()).collect()
    }
}

struct RegisteredApi {
    name: String,
    module: Option<String>,
    type_id: TypeId,
    type_name: &'static str,
    factory: Factory,
}

/// Catalog of registered API implementations and their marked operations.
#[derive(Default)]
pub struct CapabilityRegistry {
    apis: IndexMap<String, RegisteredApi>,
    tables: HashMap<TypeId, Arc<OperationTable>>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("apis", &self.apis.keys().collect::<Vec<_>>())
            .field("implementation_types", &self.tables.len())
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name`.
    ///
    /// A name that is already registered is overwritten and a warning is
    /// logged; use [`Self::try_register_api`] to reject duplicates instead.
    pub fn register_api<T: ApiImplementation>(&mut self, name: impl Into<String>) -> ApiRegistration<'_, T> {
        let name = name.into();
        if let Some(previous) = self.apis.get(&name) {
            warn!(
                api = %name,
                previous_type = previous.type_name,
                new_type = type_name::<T>(),
                "API registered twice; last registration wins"
            );
        }
        self.insert_api::<T>(name.clone());
        ApiRegistration {
            registry: self,
            name,
            _implementation: PhantomData,
        }
    }

    /// Registers `T` under `name`, failing when the name is already taken.
    pub fn try_register_api<T: ApiImplementation>(&mut self, name: impl Into<String>) -> Result<ApiRegistration<'_, T>, RegistryError> {
        let name = name.into();
        if self.apis.contains_key(&name) {
            return Err(RegistryError::duplicate_registration(name));
        }
        self.insert_api::<T>(name.clone());
        Ok(ApiRegistration {
            registry: self,
            name,
            _implementation: PhantomData,
        })
    }

    fn insert_api<T: ApiImplementation>(&mut self, name: String) {
        let factory: Factory = Arc::new(|| T::instantiate().map(|instance| Box::new(instance) as ErasedInstance));
        self.tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(OperationTable::new(type_name::<T>())));
        debug!(api = %name, implementation = type_name::<T>(), "registered API");
        // Remove first so an overwritten name moves to the end of declaration order.
        self.apis.shift_remove(&name);
        self.apis.insert(
            name.clone(),
            RegisteredApi {
                name,
                module: None,
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                factory,
            },
        );
    }

    /// Marks `operation` on `T` as invocable under `operation_id`.
    ///
    /// The callable is stored as given and invoked unchanged. Marking the
    /// same identifier again replaces the earlier callable in place.
    pub fn mark_operation<T, F>(&mut self, operation_id: impl Into<String>, operation: F) -> &mut Self
    where
        T: ApiImplementation,
        F: Fn(&T, &OperationArguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.mark_described_operation::<T, F>(OperationDescriptor::new(operation_id), operation)
    }

    /// Like [`Self::mark_operation`] but with a caller-built descriptor (e.g., one carrying a summary).
    pub fn mark_described_operation<T, F>(&mut self, descriptor: OperationDescriptor, operation: F) -> &mut Self
    where
        T: ApiImplementation,
        F: Fn(&T, &OperationArguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |instance: &(dyn Any + Send + Sync), arguments: &OperationArguments| {
            let typed = instance.downcast_ref::<T>().ok_or(InvokeFailure::TypeMismatch)?;
            operation(typed, arguments).map_err(InvokeFailure::Failed)
        });
        let table = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(OperationTable::new(type_name::<T>())));
        debug!(implementation = type_name::<T>(), operation = %descriptor.id, "marked operation");
        Arc::make_mut(table)
            .operations
            .insert(descriptor.id.clone(), MarkedOperation { descriptor, invoker });
        self
    }

    /// Marked operations of `T`, in declaration order. Unmarked or unknown types yield an empty list.
    pub fn list_operations<T: ApiImplementation>(&self) -> Vec<OperationDescriptor> {
        self.tables
            .get(&TypeId::of::<T>())
            .map(|table| table.descriptors())
            .unwrap_or_default()
    }

    /// Looks up a registered API by name.
    pub fn resolve(&self, name: &str) -> Result<ApiHandle<'_>, RegistryError> {
        self.apis
            .get(name)
            .map(|entry| ApiHandle { registry: self, entry })
            .ok_or_else(|| RegistryError::unknown_api(name))
    }

    /// Resolves a module/class binding. The class is the registration name;
    /// when the registration declared a module, it must match.
    pub fn resolve_locator(&self, locator: &ImplementationLocator) -> Result<ApiHandle<'_>, ResolutionError> {
        let handle = self.resolve(&locator.class)?;
        if let Some(registered) = handle.module()
            && registered != locator.module
        {
            return Err(ResolutionError::ModuleMismatch {
                class: locator.class.clone(),
                registered: registered.to_string(),
                configured: locator.module.clone(),
            });
        }
        Ok(handle)
    }

    /// Resolves the implementation bound to `api_name` in `config`.
    pub fn resolve_configured(&self, config: &ConfigTree, api_name: &str) -> Result<ApiHandle<'_>, ResolutionError> {
        let api = config.api(api_name).ok_or_else(|| ResolutionError::not_configured(api_name))?;
        let locator = api.locator().ok_or_else(|| ResolutionError::missing_binding(api_name))?;
        self.resolve_locator(&locator)
    }

    /// Registered API names, sorted.
    pub fn api_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.apis.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    fn table_for(&self, type_id: TypeId) -> Option<&Arc<OperationTable>> {
        self.tables.get(&type_id)
    }
}

/// Builder returned by registration; declares the module and operations of one API.
pub struct ApiRegistration<'a, T: ApiImplementation> {
    registry: &'a mut CapabilityRegistry,
    name: String,
    _implementation: PhantomData<fn() -> T>,
}

impl<T: ApiImplementation> ApiRegistration<'_, T> {
    /// Declares the module this implementation lives in; configuration bindings must then name it.
    pub fn in_module(self, module: impl Into<String>) -> Self {
        if let Some(entry) = self.registry.apis.get_mut(&self.name) {
            entry.module = Some(module.into());
        }
        self
    }

    /// Marks an operation on `T`. See [`CapabilityRegistry::mark_operation`].
    pub fn operation<F>(self, operation_id: &str, operation: F) -> Self
    where
        F: Fn(&T, &OperationArguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.registry.mark_operation::<T, F>(operation_id, operation);
        self
    }

    /// Marks an operation with a one-line summary.
    pub fn described_operation<F>(self, operation_id: &str, summary: &str, operation: F) -> Self
    where
        F: Fn(&T, &OperationArguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let descriptor = OperationDescriptor::new(operation_id).with_summary(summary);
        self.registry.mark_described_operation::<T, F>(descriptor, operation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Borrowed view of one registered API.
#[derive(Clone, Copy)]
pub struct ApiHandle<'a> {
    registry: &'a CapabilityRegistry,
    entry: &'a RegisteredApi,
}

impl fmt::Debug for ApiHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiHandle")
            .field("name", &self.entry.name)
            .field("type_name", &self.entry.type_name)
            .finish()
    }
}

impl<'a> ApiHandle<'a> {
    pub fn name(&self) -> &'a str {
        &self.entry.name
    }

    pub fn module(&self) -> Option<&'a str> {
        self.entry.module.as_deref()
    }

    pub fn type_name(&self) -> &'static str {
        self.entry.type_name
    }

    /// Marked operations of the underlying implementation type, in declaration order.
    pub fn operations(&self) -> Vec<OperationDescriptor> {
        self.registry
            .table_for(self.entry.type_id)
            .map(|table| table.descriptors())
            .unwrap_or_default()
    }

    pub fn descriptor(&self) -> ApiDescriptor {
        ApiDescriptor {
            name: self.entry.name.clone(),
            module: self.entry.module.clone(),
            type_name: self.entry.type_name.to_string(),
            operations: self.operations(),
        }
    }

    /// Detaches everything needed to construct an instance, so construction
    /// can run on another thread without borrowing the registry.
    pub fn prepare(&self) -> PendingInstance {
        let operations = self
            .registry
            .table_for(self.entry.type_id)
            .cloned()
            .unwrap_or_else(|| Arc::new(OperationTable::new(self.entry.type_name)));
        PendingInstance {
            api_name: self.entry.name.clone(),
            factory: Arc::clone(&self.entry.factory),
            operations,
        }
    }

    /// Constructs a live instance on the calling thread.
    pub fn instantiate(&self) -> Result<ApiInstance, RegistryError> {
        self.prepare().instantiate()
    }
}

/// Owned, thread-safe recipe for constructing one API instance.
#[derive(Clone)]
pub struct PendingInstance {
    api_name: String,
    factory: Factory,
    operations: Arc<OperationTable>,
}

impl fmt::Debug for PendingInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInstance")
            .field("api_name", &self.api_name)
            .field("type_name", &self.operations.type_name)
            .finish()
    }
}

impl PendingInstance {
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Runs the registered zero-argument constructor.
    pub fn instantiate(self) -> Result<ApiInstance, RegistryError> {
        let instance = (self.factory)().map_err(|error| RegistryError::instantiation(&self.api_name, format!("{error:#}")))?;
        Ok(ApiInstance::new(self.api_name, instance, self.operations))
    }
}
