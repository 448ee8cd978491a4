//! Click-to-address map widget: shell, coordinator and their configuration.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod marker;
pub mod shell;

pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use marker::*;
pub use shell::*;
