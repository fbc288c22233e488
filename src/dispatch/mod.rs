//! Command dispatch pipeline
//!
//! This module provides:
//! - Trigger matching and tool routing
//! - Channel authorization
//! - Parameter resolution and validation
//! - Command composition
//! - Response planning
//! - The Dispatcher driving one invocation through all of the above

mod auth;
mod builder;
mod dispatcher;
mod params;
mod parse;
mod response;

pub use auth::{ALL_CHANNELS, channel_names, is_authorized};
pub use builder::{BuiltCommand, RUNTIME_ENV_VARS, RuntimeContext, build, compose, display_form, substitute};
pub use dispatcher::{Dispatcher, Outcome, Stage};
pub use params::{Binding, ResolvedParameter, bind, resolve, validity};
pub use parse::{CommandLine, ExitRequest, Invocation, Route, TriggerMatcher, normalize_token, route};
pub use response::{Delivery, FILE_THRESHOLD, audit_line, help_block, plan, transcript, truncate};
