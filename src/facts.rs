//! Node fact detection.

use convergence::{Config, FileSystem, NodeFacts, Shell, ShellCommand};
use std::path::Path;

const OS_RELEASE: &str = "/etc/os-release";

/// Detect facts for this machine and apply configured overrides.
pub fn detect(shell: &dyn Shell, fs: &dyn FileSystem, config: &Config) -> NodeFacts {
    detect_for(std::env::consts::OS, shell, fs).with_overrides(&config.node)
}

fn detect_for(os: &str, shell: &dyn Shell, fs: &dyn FileSystem) -> NodeFacts {
    if os == "linux" {
        match fs.read_optional(Path::new(OS_RELEASE)) {
            Ok(Some(content)) => return NodeFacts::from_os_release(&content),
            Ok(None) => log::debug!("{OS_RELEASE} not found"),
            Err(e) => log::warn!("Could not read {OS_RELEASE}: {e}"),
        }
    }
    NodeFacts::for_os(os, kernel_release(shell))
}

/// `uname -r`, or empty when it cannot be run.
fn kernel_release(shell: &dyn Shell) -> String {
    match shell.run_capture(&ShellCommand::new("uname").arg("-r")) {
        Ok(release) => release.trim().to_string(),
        Err(e) => {
            log::debug!("Could not determine kernel release: {e}");
            String::new()
        }
    }
}
