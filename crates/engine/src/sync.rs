//! Binding controller: turns the selected API into a live implementation.
//!
//! The controller owns at most one [`Binding`]. A sync resolves the API's
//! module/class binding from the configuration tree against the capability
//! registry and runs the implementation's zero-argument constructor. A failed
//! sync never touches the existing binding.
//!
//! Construction may block on I/O, so [`SyncController::begin_sync`] runs it on
//! a Tokio blocking worker and hands back a [`SyncTicket`]. Every request is
//! stamped with a generation; [`SyncController::finish_sync`] applies a
//! completed ticket only if no newer request was issued in the meantime and
//! the API is still the selected one.
//!
//! A successful sync is acknowledged until the API selection moves to a
//! different value. Selecting another API and then coming back offers the
//! sync again even though the binding still names that API.

use std::sync::Arc;

use automation_registry::{ApiInstance, CapabilityRegistry, OperationArguments, OperationDescriptor, RegistryError, ResolutionError};
use automation_types::ConfigTree;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cascade::CascadeState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no API is selected")]
    NotSelected,

    #[error("'{api}' is already synced")]
    AlreadyBound { api: String },

    #[error("no API is synced")]
    NotBound,

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("failed to instantiate '{api}': {reason}")]
    Instantiation { api: String, reason: String },

    #[error("sync of '{api}' was superseded by a newer selection")]
    Superseded { api: String },

    #[error("sync worker for '{api}' stopped: {reason}")]
    Worker { api: String, reason: String },

    #[error(transparent)]
    Invocation(RegistryError),
}

impl SyncError {
    fn from_instantiation(api_name: &str, error: RegistryError) -> Self {
        match error {
            RegistryError::Instantiation { reason, .. } => Self::Instantiation {
                api: api_name.to_string(),
                reason,
            },
            other => Self::Resolution(ResolutionError::Registry(other)),
        }
    }
}

/// The API the application is currently connected to.
#[derive(Debug)]
pub struct Binding {
    api_name: String,
    instance: ApiInstance,
}

impl Binding {
    /// Configured API name (not the implementation's registration name).
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn instance(&self) -> &ApiInstance {
        &self.instance
    }
}

/// In-flight construction started by [`SyncController::begin_sync`].
#[derive(Debug)]
pub struct SyncTicket {
    api_name: String,
    generation: u64,
    task: JoinHandle<Result<ApiInstance, RegistryError>>,
}

impl SyncTicket {
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for construction to finish.
    pub async fn wait(mut self) -> SyncCompletion {
        self.finished().await
    }

    /// Waits without consuming the ticket. Dropping the future before it
    /// resolves leaves the ticket pending; once it has resolved the ticket is spent.
    pub(crate) async fn finished(&mut self) -> SyncCompletion {
        let outcome = match (&mut self.task).await {
            Ok(Ok(instance)) => Ok(instance),
            Ok(Err(error)) => Err(SyncError::from_instantiation(&self.api_name, error)),
            Err(join_error) => Err(SyncError::Worker {
                api: self.api_name.clone(),
                reason: join_error.to_string(),
            }),
        };
        SyncCompletion {
            api_name: self.api_name.clone(),
            generation: self.generation,
            outcome,
        }
    }
}

/// Result of a finished background construction, not yet applied.
#[derive(Debug)]
pub struct SyncCompletion {
    pub api_name: String,
    pub generation: u64,
    pub outcome: Result<ApiInstance, SyncError>,
}

#[derive(Debug)]
pub struct SyncController {
    registry: Arc<CapabilityRegistry>,
    config: Arc<ConfigTree>,
    binding: Option<Binding>,
    latest_generation: u64,
    /// API selection last reported through [`SyncController::observe_selection`].
    observed_api: Option<String>,
    /// Set by a successful sync, cleared when the API selection changes.
    acknowledged: bool,
}

impl SyncController {
    pub fn new(registry: Arc<CapabilityRegistry>, config: Arc<ConfigTree>) -> Self {
        Self {
            registry,
            config,
            binding: None,
            latest_generation: 0,
            observed_api: None,
            acknowledged: false,
        }
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn bound_api_name(&self) -> Option<&str> {
        self.binding.as_ref().map(Binding::api_name)
    }

    /// Records the current selection. Moving the API level to a different
    /// value withdraws the acknowledgement of the last sync.
    pub fn observe_selection(&mut self, selection: &CascadeState) {
        if self.observed_api != selection.api {
            self.observed_api = selection.api.clone();
            self.acknowledged = false;
        }
    }

    /// True when an API is selected, unless it is the bound API and its sync
    /// has not been followed by a change of API selection.
    pub fn can_sync(&self, selection: &CascadeState) -> bool {
        match selection.api.as_deref() {
            Some(api) => !(self.acknowledged && self.bound_api_name() == Some(api)),
            None => false,
        }
    }

    /// Resolves and constructs `api_name` on the calling thread, replacing the binding on success.
    pub fn sync(&mut self, api_name: &str) -> Result<&Binding, SyncError> {
        self.latest_generation += 1;
        let generation = self.latest_generation;
        let instance = self
            .resolve(api_name)?
            .instantiate()
            .map_err(|error| SyncError::from_instantiation(api_name, error))
            .inspect_err(|error| warn!(api = %api_name, error = %error, "sync failed"))?;
        Ok(self.install(api_name, instance, generation))
    }

    /// Resolves `api_name` now and starts construction on a blocking worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn begin_sync(&mut self, api_name: &str) -> Result<SyncTicket, SyncError> {
        let pending = self.resolve(api_name)?.prepare();
        self.latest_generation += 1;
        let generation = self.latest_generation;
        debug!(api = %api_name, generation, "background sync started");
        let task = tokio::task::spawn_blocking(move || pending.instantiate());
        Ok(SyncTicket {
            api_name: api_name.to_string(),
            generation,
            task,
        })
    }

    /// Applies a finished background construction.
    ///
    /// Results from an older request, or for an API that is no longer
    /// selected, are dropped with [`SyncError::Superseded`].
    pub fn finish_sync(&mut self, completion: SyncCompletion, selected_api: Option<&str>) -> Result<&Binding, SyncError> {
        let SyncCompletion {
            api_name,
            generation,
            outcome,
        } = completion;
        if generation != self.latest_generation || selected_api != Some(api_name.as_str()) {
            debug!(api = %api_name, generation, latest = self.latest_generation, "discarding stale sync result");
            return Err(SyncError::Superseded { api: api_name });
        }
        let instance = outcome.inspect_err(|error| warn!(api = %api_name, error = %error, "sync failed"))?;
        Ok(self.install(&api_name, instance, generation))
    }

    /// Display names of the marked operations of `api_name`, sorted.
    ///
    /// Independent of the binding. Resolution failures yield an empty list.
    pub fn operations_for(&self, api_name: &str) -> Vec<String> {
        self.operation_descriptors_for(api_name)
            .into_iter()
            .map(|descriptor| descriptor.display_name)
            .collect()
    }

    /// Operation descriptors of `api_name`, sorted by display name.
    pub fn operation_descriptors_for(&self, api_name: &str) -> Vec<OperationDescriptor> {
        match self.registry.resolve_configured(&self.config, api_name) {
            Ok(handle) => {
                let mut operations = handle.operations();
                operations.sort_by(|left, right| left.display_name.cmp(&right.display_name));
                operations
            }
            Err(error) => {
                warn!(api = %api_name, error = %error, "cannot list operations");
                Vec::new()
            }
        }
    }

    /// Invokes a marked operation on the bound instance.
    pub fn invoke(&self, operation_id: &str, arguments: &OperationArguments) -> Result<Value, SyncError> {
        let binding = self.binding.as_ref().ok_or(SyncError::NotBound)?;
        binding.instance.invoke(operation_id, arguments).map_err(SyncError::Invocation)
    }

    fn resolve(&self, api_name: &str) -> Result<automation_registry::ApiHandle<'_>, SyncError> {
        self.registry
            .resolve_configured(&self.config, api_name)
            .inspect_err(|error| warn!(api = %api_name, error = %error, "cannot resolve API"))
            .map_err(SyncError::from)
    }

    fn install(&mut self, api_name: &str, instance: ApiInstance, generation: u64) -> &Binding {
        if let Some(previous) = self.binding.as_ref() {
            debug!(previous = %previous.api_name, "dropping previous binding");
        }
        info!(api = %api_name, implementation = instance.type_name(), generation, "synced");
        self.observed_api = Some(api_name.to_string());
        self.acknowledged = true;
        self.binding.insert(Binding {
            api_name: api_name.to_string(),
            instance,
        })
    }
}
