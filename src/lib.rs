//! chatops - run catalogued shell tools from chat
//!
//! A chat message of the form `<trigger> <tool> [arg...]` is matched against a
//! YAML catalog of tools, checked against the host environment and the tool's
//! channel permissions, validated parameter by parameter, and run under bash.
//! The output goes back to the channel inline, privately, or as a file.

pub mod chat;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod tools;

pub use error::{ChatOpsError, DispatchError, Result};
