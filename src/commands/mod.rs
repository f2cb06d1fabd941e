//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod import;
pub mod inspect;
pub mod utils;

// Re-export main command functions
pub use import::{execute_import, validate_args, ImportArgs};
pub use inspect::{execute_inspect, render_plan, InspectArgs};
pub use utils::{display_mapping, display_version};
