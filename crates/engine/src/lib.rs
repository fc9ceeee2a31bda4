//! # Automation Engine core
//!
//! Ties the configuration tree and the capability registry to the user's
//! selections.
//!
//! - **`cascade`**: the dependent API → Environment → Tenant selection
//! - **`sync`**: resolving the selected API into a live binding
//! - **`session`**: application-root state and the catalog refresh trigger
//! - **`console`**: command routing for the text console
//! - **`canvas`**: the node canvas collaborator
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use automation_engine::Session;
//! use automation_registry::{CapabilityRegistry, config};
//! use automation_types::CascadeLevel;
//!
//! let mut registry = CapabilityRegistry::new();
//! automation_api::register_builtin_apis(&mut registry);
//! let tree = config::load(&config::default_config_path());
//!
//! let mut session = Session::new(Arc::new(registry), Arc::new(tree));
//! session.select(CascadeLevel::Api, Some("Example"))?;
//! println!("{:?}", session.catalog());
//! ```

pub mod canvas;
pub mod cascade;
pub mod console;
pub mod session;
pub mod sync;

pub use canvas::{Canvas, CanvasError, CanvasNode, NodeBoard, Point};
pub use cascade::{CascadeError, CascadeEvent, CascadeState, SelectionCascade};
pub use console::{BufferedOutput, ConsoleDispatcher, ConsoleOutput, DispatchOutcome, InteractiveConsole, WELCOME_LINES};
pub use session::Session;
pub use sync::{Binding, SyncCompletion, SyncController, SyncError, SyncTicket};
