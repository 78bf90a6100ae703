pub mod clean;
pub mod config;
pub mod consolidate;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod template;

pub use error::{Result, ToolError};
