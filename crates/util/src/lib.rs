//! Small helpers shared by the Automation Engine crates.

pub mod lexing;
pub mod paths;
pub mod runtime;

pub use lexing::split_command_words;
pub use paths::{expand_tilde, path_from_env};
pub use runtime::block_on_future;
