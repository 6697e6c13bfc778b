//! Mutation action execution.
//!
//! The decision engine never touches the host directly; it issues
//! [`MutationAction`]s through this trait. That keeps the engine testable
//! without a real OS target and lets the CLI offer a dry-run mode.
//!
//! [`SystemExecutor`] performs the real mutations. They are Windows host
//! operations (registry writes, scheduled tasks, appx packages); on other
//! platforms execution is refused with an `UnsupportedPlatform` error.

use crate::error::{Result, TunemarkError};
#[cfg(windows)]
use crate::tweaks::ActionKind;
use crate::tweaks::MutationAction;

/// Placeholder recorded when the pre-change value of a config key cannot be
/// read (no registry access, or the key is not a readable value at all).
pub const UNCAPTURED_VALUE: &str = "<unset>";

/// Seam between the decision engine and the host.
///
/// Not internally synchronized; callers serialize access (see the
/// concurrency notes on [`DecisionEngine`](crate::engine::DecisionEngine)).
pub trait ActionExecutor {
    /// Issue one mutation action. Non-idempotent; no cancellation once
    /// started.
    fn execute(&mut self, action: &MutationAction) -> Result<()>;

    /// Read the current value of a config key for snapshot capture.
    /// `None` when the key is not readable in this environment.
    fn read_key(&self, config_key: &str) -> Option<String>;

    /// Restore a config key to a previously captured value.
    fn restore_key(&mut self, config_key: &str, value: &str) -> Result<()>;
}

impl<T: ActionExecutor + ?Sized> ActionExecutor for Box<T> {
    fn execute(&mut self, action: &MutationAction) -> Result<()> {
        (**self).execute(action)
    }

    fn read_key(&self, config_key: &str) -> Option<String> {
        (**self).read_key(config_key)
    }

    fn restore_key(&mut self, config_key: &str, value: &str) -> Result<()> {
        (**self).restore_key(config_key, value)
    }
}

/// Executor that mutates the real host.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }

    #[cfg(windows)]
    fn run(program: &str, args: &[String]) -> Result<()> {
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(|e| TunemarkError::TweakAction(format!("{}: {}", program, e)))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(TunemarkError::TweakAction(format!(
                "{} exited with {} (run as Administrator?): {}",
                program,
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[cfg(windows)]
impl ActionExecutor for SystemExecutor {
    fn execute(&mut self, action: &MutationAction) -> Result<()> {
        log::debug!("Executing action: {}", action.description);
        match &action.kind {
            ActionKind::SetRegistryValue {
                key,
                value_name,
                value,
            } => Self::run(
                "reg",
                &[
                    "add".to_string(),
                    key.clone(),
                    "/v".to_string(),
                    value_name.clone(),
                    "/t".to_string(),
                    "REG_DWORD".to_string(),
                    "/d".to_string(),
                    value.clone(),
                    "/f".to_string(),
                ],
            ),
            ActionKind::DisableScheduledTask { task } => Self::run(
                "schtasks",
                &[
                    "/Change".to_string(),
                    "/TN".to_string(),
                    task.clone(),
                    "/DISABLE".to_string(),
                ],
            ),
            ActionKind::RemoveAppPackage { pattern } => Self::run(
                "powershell",
                &[
                    "-NoProfile".to_string(),
                    "-Command".to_string(),
                    format!("Get-AppxPackage {} | Remove-AppxPackage", pattern),
                ],
            ),
            ActionKind::ShellCommand { program, args } => Self::run(program, args),
        }
    }

    fn read_key(&self, config_key: &str) -> Option<String> {
        use winreg::enums::HKEY_LOCAL_MACHINE;
        use winreg::RegKey;

        // Only registry-backed keys have a readable pre-change value.
        let path = config_key.strip_prefix("reg:")?;
        let (key_path, value_name) = path.rsplit_once('\\')?;
        let key_path = key_path.strip_prefix(r"HKEY_LOCAL_MACHINE\")?;
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let subkey = hklm.open_subkey(key_path).ok()?;
        if let Ok(dword) = subkey.get_value::<u32, _>(value_name) {
            return Some(dword.to_string());
        }
        subkey.get_value::<String, _>(value_name).ok()
    }

    fn restore_key(&mut self, config_key: &str, value: &str) -> Result<()> {
        if let Some(path) = config_key.strip_prefix("reg:") {
            if value == UNCAPTURED_VALUE {
                log::warn!("No captured value for {}, leaving as-is", config_key);
                return Ok(());
            }
            let (key, value_name) = path.rsplit_once('\\').ok_or_else(|| {
                TunemarkError::Parse(format!("malformed registry key '{}'", config_key))
            })?;
            return Self::run(
                "reg",
                &[
                    "add".to_string(),
                    key.to_string(),
                    "/v".to_string(),
                    value_name.to_string(),
                    "/t".to_string(),
                    "REG_DWORD".to_string(),
                    "/d".to_string(),
                    value.to_string(),
                    "/f".to_string(),
                ],
            );
        }
        if let Some(task) = config_key.strip_prefix("task:") {
            // Disabling is the only mutation we perform on tasks, so revert
            // re-enables regardless of the captured placeholder.
            return Self::run(
                "schtasks",
                &[
                    "/Change".to_string(),
                    "/TN".to_string(),
                    task.to_string(),
                    "/ENABLE".to_string(),
                ],
            );
        }
        // Removed packages and one-shot commands have no inverse.
        log::warn!("Cannot restore {}, no inverse operation", config_key);
        Ok(())
    }
}

#[cfg(not(windows))]
impl ActionExecutor for SystemExecutor {
    fn execute(&mut self, action: &MutationAction) -> Result<()> {
        log::debug!("Refusing action off-Windows: {}", action.description);
        Err(TunemarkError::UnsupportedPlatform(
            "host mutations target Windows".to_string(),
        ))
    }

    fn read_key(&self, _config_key: &str) -> Option<String> {
        None
    }

    fn restore_key(&mut self, _config_key: &str, _value: &str) -> Result<()> {
        Err(TunemarkError::UnsupportedPlatform(
            "host mutations target Windows".to_string(),
        ))
    }
}

/// Executor that records actions instead of performing them. Backs the CLI
/// `--dry-run` flag and the engine tests.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    /// Descriptions of executed actions, in order
    pub executed: Vec<String>,
    /// `(config_key, value)` pairs restored, in order
    pub restored: Vec<(String, String)>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionExecutor for DryRunExecutor {
    fn execute(&mut self, action: &MutationAction) -> Result<()> {
        log::info!("[dry-run] {}", action.description);
        self.executed.push(action.description.clone());
        Ok(())
    }

    fn read_key(&self, _config_key: &str) -> Option<String> {
        None
    }

    fn restore_key(&mut self, config_key: &str, value: &str) -> Result<()> {
        log::info!("[dry-run] restore {} = {}", config_key, value);
        self.restored
            .push((config_key.to_string(), value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tweaks::ActionKind;

    fn sample_action() -> MutationAction {
        MutationAction {
            description: "Disable the scheduled defrag task".into(),
            kind: ActionKind::DisableScheduledTask {
                task: r"\Microsoft\Windows\Defrag\ScheduledDefrag".into(),
            },
        }
    }

    #[test]
    fn test_dry_run_records_in_order() {
        let mut executor = DryRunExecutor::new();
        executor.execute(&sample_action()).unwrap();
        executor
            .execute(&MutationAction {
                description: "second".into(),
                kind: ActionKind::ShellCommand {
                    program: "netsh".into(),
                    args: vec![],
                },
            })
            .unwrap();
        assert_eq!(
            executor.executed,
            vec!["Disable the scheduled defrag task".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_dry_run_read_key_is_uncapturable() {
        let executor = DryRunExecutor::new();
        assert!(executor.read_key("reg:HKLM\\whatever\\Value").is_none());
    }

    #[test]
    fn test_dry_run_restore_records_pairs() {
        let mut executor = DryRunExecutor::new();
        executor.restore_key("task:\\Foo", UNCAPTURED_VALUE).unwrap();
        assert_eq!(
            executor.restored,
            vec![("task:\\Foo".to_string(), UNCAPTURED_VALUE.to_string())]
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_system_executor_refuses_off_windows() {
        let mut executor = SystemExecutor::new();
        let err = executor.execute(&sample_action()).unwrap_err();
        assert!(err.to_string().contains("Unsupported platform"));
        assert!(executor.read_key("reg:HKLM\\x\\y").is_none());
    }
}
