//! Application-root state: the selection cascade, the binding controller,
//! the published operation catalog and the node canvas.
//!
//! The catalog is recomputed whenever the tenant level settles, which is the
//! last step of every cascade update, so it never reflects a half-updated
//! selection.

use std::sync::Arc;

use automation_registry::{CapabilityRegistry, OperationArguments, OperationDescriptor};
use automation_types::{CascadeLevel, ConfigTree};
use serde_json::Value;
use tracing::debug;

use crate::{
    canvas::{Canvas, CanvasError, CanvasNode, NodeBoard, Point},
    cascade::{CascadeError, CascadeEvent, CascadeState, SelectionCascade},
    sync::{Binding, SyncCompletion, SyncController, SyncError, SyncTicket},
};

#[derive(Debug)]
pub struct Session {
    cascade: SelectionCascade,
    controller: SyncController,
    catalog: Vec<String>,
    canvas: NodeBoard,
}

impl Session {
    pub fn new(registry: Arc<CapabilityRegistry>, config: Arc<ConfigTree>) -> Self {
        let mut session = Self {
            cascade: SelectionCascade::new(Arc::clone(&config)),
            controller: SyncController::new(registry, config),
            catalog: Vec::new(),
            canvas: NodeBoard::new(),
        };
        session.refresh_catalog();
        session
    }

    pub fn selection(&self) -> &CascadeState {
        self.cascade.state()
    }

    pub fn options_for(&self, level: CascadeLevel) -> Vec<String> {
        self.cascade.options_for(level)
    }

    /// Display names of the selected API's operations.
    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Descriptors behind [`Self::catalog`], in the same order.
    pub fn catalog_descriptors(&self) -> Vec<OperationDescriptor> {
        self.cascade
            .selected(CascadeLevel::Api)
            .map(|api| self.controller.operation_descriptors_for(api))
            .unwrap_or_default()
    }

    /// Sorted operation descriptors of any configured API, selected or not.
    pub fn operation_descriptors_for(&self, api_name: &str) -> Vec<OperationDescriptor> {
        self.controller.operation_descriptors_for(api_name)
    }

    /// Settings object of the selected tenant.
    pub fn tenant_settings(&self) -> Option<&Value> {
        self.cascade.selected_tenant_settings()
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.controller.binding()
    }

    pub fn can_sync(&self) -> bool {
        self.controller.can_sync(self.cascade.state())
    }

    /// Changes one selection level. The catalog is refreshed once the cascade has settled,
    /// including when the selection was rejected.
    pub fn select(&mut self, level: CascadeLevel, value: Option<&str>) -> Result<Vec<CascadeEvent>, CascadeError> {
        let result = self.cascade.select(level, value);
        self.controller.observe_selection(self.cascade.state());
        let settled = match &result {
            Ok(events) => events.last() == Some(&CascadeEvent::Settled),
            Err(_) => true,
        };
        if settled {
            self.refresh_catalog();
        }
        result
    }

    /// Syncs the selected API on the calling thread.
    pub fn sync_selected(&mut self) -> Result<&Binding, SyncError> {
        let api = self.sync_target()?;
        self.controller.sync(&api)
    }

    /// Starts a background sync of the selected API. Requires a Tokio runtime.
    pub fn begin_sync_selected(&mut self) -> Result<SyncTicket, SyncError> {
        let api = self.sync_target()?;
        self.controller.begin_sync(&api)
    }

    /// Applies a finished background sync against the current selection.
    pub fn finish_sync(&mut self, completion: SyncCompletion) -> Result<&Binding, SyncError> {
        let selected = self.cascade.state().api.clone();
        self.controller.finish_sync(completion, selected.as_deref())
    }

    pub fn invoke(&self, operation_id: &str, arguments: &OperationArguments) -> Result<Value, SyncError> {
        self.controller.invoke(operation_id, arguments)
    }

    pub fn place_node(&mut self, name: &str, at: Point) -> Result<&CanvasNode, CanvasError> {
        self.canvas.drop_node(name, at)
    }

    pub fn nodes(&self) -> &[CanvasNode] {
        self.canvas.nodes()
    }

    pub fn clear_nodes(&mut self) {
        self.canvas.clear();
    }

    fn sync_target(&self) -> Result<String, SyncError> {
        let api = self.cascade.state().api.clone().ok_or(SyncError::NotSelected)?;
        if !self.can_sync() {
            return Err(SyncError::AlreadyBound { api });
        }
        Ok(api)
    }

    fn refresh_catalog(&mut self) {
        self.catalog = self
            .cascade
            .selected(CascadeLevel::Api)
            .map(|api| self.controller.operations_for(api))
            .unwrap_or_default();
        debug!(operation_count = self.catalog.len(), "catalog refreshed");
    }
}
