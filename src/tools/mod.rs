//! Tool System - tool definitions and catalog loading

mod catalog;
mod definition;

pub use catalog::{EXIT_WORD, ToolCatalog};
pub use definition::{
    AdminConfig, DependencyInstall, MessageTemplate, ParameterSpec, ResponseMode, ToolDefinition,
};
