// packages/interpose/src/runtime/system.rs
//! Shell commands through `base.system`

use crate::interception::registry::Registry;
use crate::runtime::builtins::SYSTEM;
use crate::utils::errors::{MockError, Result};
use std::process::Command;
use tracing::{debug, warn};

/// Exit code reported when the shell itself cannot be started
pub const SPAWN_FAILED: i32 = 127;

/// Run `command` through `sh -c` and return its exit code.
///
/// Termination by signal is reported as `128 + signal`, as shells do.
pub fn run_system(command: &str) -> i32 {
    debug!("Running system command: {}", command);

    match Command::new("sh").arg("-c").arg(command).status() {
        Ok(status) => status.code().unwrap_or_else(|| signal_code(&status)),
        Err(e) => {
            warn!("Failed to spawn shell for '{}': {}", command, e);
            SPAWN_FAILED
        }
    }
}

#[cfg(unix)]
fn signal_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| 128 + signal).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_code(_status: &std::process::ExitStatus) -> i32 {
    -1
}

/// Sleep by shelling out, failing if the command does not exit cleanly
pub fn sleep_for(registry: &Registry, seconds: u64) -> Result<()> {
    let status: i32 = registry.call(SYSTEM, format!("sleep {}", seconds))?;

    if status != 0 {
        return Err(MockError::ProcessFailed(format!(
            "sleeping failed with exit code {}",
            status
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::Substitutions;
    use crate::recording::CallLog;

    #[test]
    fn test_sleep_reports_failure() {
        let registry = Registry::with_builtins();

        let result = registry
            .with_mock(
                Substitutions::new().returning::<String, i32>(SYSTEM, 127),
                || sleep_for(&registry, 60),
            )
            .unwrap();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("sleeping failed"));
        assert!(err.to_string().contains("127"));
    }

    #[test]
    fn test_sleep_succeeds_without_sleeping() {
        let registry = Registry::with_builtins();
        let log: CallLog<String, i32> = CallLog::new();

        registry
            .with_mock(
                Substitutions::new().with(SYSTEM, log.record(|_| 0)),
                || sleep_for(&registry, 60),
            )
            .unwrap()
            .unwrap();

        assert_eq!(log.last_args().as_deref(), Some("sleep 60"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_system_exit_codes() {
        assert_eq!(run_system("exit 0"), 0);
        assert_eq!(run_system("exit 3"), 3);
    }
}
