//! Host execution - shell runner, environment checks, vendor installs

mod host;
mod mock;
mod runner;
mod vendor;

pub use host::{HostEnvironment, SystemHost};
pub use mock::{FakeHost, ScriptedRunner};
pub use runner::{CommandRunner, ERROR_PREFIX, ShellRunner, bash, failure_text, is_failure};
pub use vendor::{InstallReport, install_all, install_script};
