//! Dependent API → Environment → Tenant selection.
//!
//! Each level's options are derived from the configuration tree and the
//! selections above it. After any change, every lower level is re-derived
//! root-first: a value that is still among its level's options is kept,
//! anything else is reset to unselected. The tenant level settling is always
//! the last event of an update.

use std::sync::Arc;

use automation_types::{CascadeLevel, ConfigTree};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// The current (api, environment, tenant) triple. `None` means unselected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeState {
    pub api: Option<String>,
    pub environment: Option<String>,
    pub tenant: Option<String>,
}

impl CascadeState {
    pub fn get(&self, level: CascadeLevel) -> Option<&str> {
        match level {
            CascadeLevel::Api => self.api.as_deref(),
            CascadeLevel::Environment => self.environment.as_deref(),
            CascadeLevel::Tenant => self.tenant.as_deref(),
        }
    }

    fn slot_mut(&mut self, level: CascadeLevel) -> &mut Option<String> {
        match level {
            CascadeLevel::Api => &mut self.api,
            CascadeLevel::Environment => &mut self.environment,
            CascadeLevel::Tenant => &mut self.tenant,
        }
    }
}

/// What happened to the cascade during one update, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeEvent {
    /// A level took a new value.
    Selected { level: CascadeLevel, value: String },
    /// The user explicitly unselected a level.
    Cleared { level: CascadeLevel },
    /// A level's value stopped being valid and was unselected.
    Reset { level: CascadeLevel, previous: String },
    /// The leaf level finished recomputing; always the final event.
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CascadeError {
    #[error("'{value}' is not a valid {level} selection")]
    InvalidSelection { level: CascadeLevel, value: String },
}

#[derive(Debug, Clone)]
pub struct SelectionCascade {
    config: Arc<ConfigTree>,
    state: CascadeState,
}

impl SelectionCascade {
    pub fn new(config: Arc<ConfigTree>) -> Self {
        Self {
            config,
            state: CascadeState::default(),
        }
    }

    pub fn state(&self) -> &CascadeState {
        &self.state
    }

    pub fn selected(&self, level: CascadeLevel) -> Option<&str> {
        self.state.get(level)
    }

    /// Settings of the selected tenant, when all three levels are selected.
    pub fn selected_tenant_settings(&self) -> Option<&Value> {
        let CascadeState {
            api: Some(api),
            environment: Some(environment),
            tenant: Some(tenant),
        } = &self.state
        else {
            return None;
        };
        self.config.tenant_settings(api, environment, tenant)
    }

    /// Options for `level` given the current ancestors, sorted lexicographically.
    pub fn options_for(&self, level: CascadeLevel) -> Vec<String> {
        match level {
            CascadeLevel::Api => self.config.api_names(),
            CascadeLevel::Environment => self
                .state
                .api
                .as_deref()
                .map(|api| self.config.environment_names(api))
                .unwrap_or_default(),
            CascadeLevel::Tenant => match (self.state.api.as_deref(), self.state.environment.as_deref()) {
                (Some(api), Some(environment)) => self.config.tenant_names(api, environment),
                _ => Vec::new(),
            },
        }
    }

    /// Sets `level` to `value` (`None` unselects) and re-derives every level below it.
    ///
    /// A value that is not among the level's current options is rejected
    /// with [`CascadeError::InvalidSelection`]; the level is then unselected
    /// and its descendants are re-derived before the error is returned.
    pub fn select(&mut self, level: CascadeLevel, value: Option<&str>) -> Result<Vec<CascadeEvent>, CascadeError> {
        let mut events = Vec::new();
        let rejected = match value {
            Some(candidate) if !self.options_for(level).iter().any(|option| option == candidate) => {
                self.reset(level, &mut events);
                Some(candidate.to_string())
            }
            Some(candidate) => {
                let slot = self.state.slot_mut(level);
                if slot.as_deref() != Some(candidate) {
                    *slot = Some(candidate.to_string());
                    events.push(CascadeEvent::Selected {
                        level,
                        value: candidate.to_string(),
                    });
                }
                None
            }
            None => {
                if self.state.slot_mut(level).take().is_some() {
                    events.push(CascadeEvent::Cleared { level });
                }
                None
            }
        };

        self.recompute_below(level, &mut events);
        events.push(CascadeEvent::Settled);
        debug!(level = %level, state = ?self.state, event_count = events.len(), "cascade settled");

        match rejected {
            Some(value) => Err(CascadeError::InvalidSelection { level, value }),
            None => Ok(events),
        }
    }

    fn recompute_below(&mut self, level: CascadeLevel, events: &mut Vec<CascadeEvent>) {
        for descendant in level.descendants() {
            let Some(current) = self.state.get(descendant).map(str::to_string) else {
                continue;
            };
            if !self.options_for(descendant).contains(&current) {
                self.reset(descendant, events);
            }
        }
    }

    fn reset(&mut self, level: CascadeLevel, events: &mut Vec<CascadeEvent>) {
        if let Some(previous) = self.state.slot_mut(level).take() {
            events.push(CascadeEvent::Reset { level, previous });
        }
    }
}
