//! Vendor dependency installation
//!
//! Each configured dependency's install command runs from inside `vendor/`.

use crate::tools::DependencyInstall;

use super::runner::{CommandRunner, bash, is_failure};

/// Result of one install command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub name: String,
    pub output: String,
    pub succeeded: bool,
}

/// Script run for one dependency
pub fn install_script(dependency: &DependencyInstall) -> String {
    format!("pushd vendor && {} && popd", dependency.install_line())
}

/// Run every install command in order; failures are reported, not fatal
pub async fn install_all(
    runner: &dyn CommandRunner,
    dependencies: &[DependencyInstall],
) -> Vec<InstallReport> {
    log::debug!("installing vendor dependencies");
    let mut reports = Vec::with_capacity(dependencies.len());
    for dependency in dependencies {
        log::info!("{}", dependency.name);
        let script = install_script(dependency);
        log::debug!("bash -c {}", script);
        let output = runner.run(&bash(script)).await;
        log::info!("{}", output);
        reports.push(InstallReport {
            name: dependency.name.clone(),
            succeeded: !is_failure(&output),
            output,
        });
    }
    reports
}
