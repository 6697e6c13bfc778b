//! Tweak catalog — named, atomic sets of host configuration mutations gated
//! by applicability predicates.
//!
//! A [`Tweak`] pairs a predicate over the hardware profile and the
//! operator-selected [`UsageProfile`] with a list of [`MutationAction`]s.
//! The catalog is registered once at startup in a fixed order and is
//! immutable afterwards; the decision engine looks tweaks up by name and
//! issues their actions through an [`ActionExecutor`](executor::ActionExecutor).
//!
//! Actions are opaque to the engine: it only cares about the config key an
//! action touches (for pre-change snapshot capture) and whether execution
//! succeeded.

pub mod executor;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hardware::{DiskType, HardwareProfile};

/// Operator-selected intent. Pure predicate input; carries no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageProfile {
    Gaming,
    Work,
    ExtremeLatency,
}

impl std::fmt::Display for UsageProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gaming => write!(f, "gaming"),
            Self::Work => write!(f, "work"),
            Self::ExtremeLatency => write!(f, "extreme-latency"),
        }
    }
}

impl std::str::FromStr for UsageProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gaming" => Ok(Self::Gaming),
            "work" => Ok(Self::Work),
            "extreme-latency" | "extreme_latency" | "latency" => Ok(Self::ExtremeLatency),
            other => Err(format!(
                "unknown usage profile '{}' (expected gaming, work, or extreme-latency)",
                other
            )),
        }
    }
}

/// Outcome of an applicability predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Apply,
    Skip(String),
}

/// Concrete mechanism of a mutation. The engine never interprets these; the
/// executor does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Write a registry value
    SetRegistryValue {
        key: String,
        value_name: String,
        value: String,
    },
    /// Disable a scheduled task
    DisableScheduledTask { task: String },
    /// Remove a bundled app package by name pattern
    RemoveAppPackage { pattern: String },
    /// Run an arbitrary shell command
    ShellCommand { program: String, args: Vec<String> },
}

/// Opaque unit of host configuration change with a success/failure outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAction {
    /// Human-readable summary for logs and reports
    pub description: String,
    /// Mechanism, interpreted by the executor
    pub kind: ActionKind,
}

impl MutationAction {
    /// Stable identifier for the host state this action touches. Used as
    /// the snapshot backup key.
    pub fn config_key(&self) -> String {
        match &self.kind {
            ActionKind::SetRegistryValue {
                key, value_name, ..
            } => format!("reg:{}\\{}", key, value_name),
            ActionKind::DisableScheduledTask { task } => format!("task:{}", task),
            ActionKind::RemoveAppPackage { pattern } => format!("appx:{}", pattern),
            ActionKind::ShellCommand { program, args } => {
                format!("cmd:{} {}", program, args.join(" "))
            }
        }
    }
}

/// A named tweak: applicability predicate plus action list.
///
/// Both functions are pure; the action list may vary with the profile
/// (TimerResolution adds a defrag-disable action on HDD systems).
pub struct Tweak {
    pub name: &'static str,
    pub applicability: fn(&HardwareProfile, UsageProfile) -> Decision,
    pub actions: fn(&HardwareProfile, UsageProfile) -> Vec<MutationAction>,
}

const SYSTEM_PROFILE_KEY: &str =
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile";
const GAMES_TASK_KEY: &str =
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile\Tasks\Games";
const SYSTEM_RESTORE_TASK: &str = r"\Microsoft\Windows\SystemRestore\RV";
const DEFRAG_TASK: &str = r"\Microsoft\Windows\Defrag\ScheduledDefrag";
const DEBLOAT_PATTERNS: [&str; 3] = ["*xbox*", "*3dviewer*", "*candycrush*"];

fn regedit_gaming_applicability(profile: &HardwareProfile, usage: UsageProfile) -> Decision {
    if usage == UsageProfile::Gaming && profile.cpu_cores < 4 {
        Decision::Skip(
            "low core/thread CPU is unlikely to benefit from multimedia scheduling changes"
                .to_string(),
        )
    } else {
        Decision::Apply
    }
}

fn regedit_gaming_actions(_profile: &HardwareProfile, _usage: UsageProfile) -> Vec<MutationAction> {
    vec![
        MutationAction {
            description: "Set multimedia SystemResponsiveness to 0".to_string(),
            kind: ActionKind::SetRegistryValue {
                key: SYSTEM_PROFILE_KEY.to_string(),
                value_name: "SystemResponsiveness".to_string(),
                value: "0".to_string(),
            },
        },
        MutationAction {
            description: "Raise GPU priority for the Games task class".to_string(),
            kind: ActionKind::SetRegistryValue {
                key: GAMES_TASK_KEY.to_string(),
                value_name: "GPU Priority".to_string(),
                value: "8".to_string(),
            },
        },
    ]
}

fn timer_resolution_applicability(_profile: &HardwareProfile, usage: UsageProfile) -> Decision {
    if usage != UsageProfile::Gaming {
        Decision::Skip(
            "scheduler/timer changes are too aggressive outside the gaming usage profile"
                .to_string(),
        )
    } else {
        Decision::Apply
    }
}

fn timer_resolution_actions(profile: &HardwareProfile, _usage: UsageProfile) -> Vec<MutationAction> {
    let mut actions = vec![MutationAction {
        description: "Disable the SystemRestore scheduled task".to_string(),
        kind: ActionKind::DisableScheduledTask {
            task: SYSTEM_RESTORE_TASK.to_string(),
        },
    }];
    // Scheduled defrag only hurts on spinning disks; SSDs keep it off the list.
    if profile.disk_type == DiskType::Hdd {
        actions.push(MutationAction {
            description: "Disable the scheduled defrag task".to_string(),
            kind: ActionKind::DisableScheduledTask {
                task: DEFRAG_TASK.to_string(),
            },
        });
    }
    actions
}

fn debloat_applicability(profile: &HardwareProfile, _usage: UsageProfile) -> Decision {
    if profile.ram_total_gb >= 8.0 {
        Decision::Skip(
            "sufficient RAM; bundled apps may still be wanted".to_string(),
        )
    } else {
        Decision::Apply
    }
}

fn debloat_actions(_profile: &HardwareProfile, _usage: UsageProfile) -> Vec<MutationAction> {
    DEBLOAT_PATTERNS
        .iter()
        .map(|pattern| MutationAction {
            description: format!("Remove bundled app packages matching {}", pattern),
            kind: ActionKind::RemoveAppPackage {
                pattern: pattern.to_string(),
            },
        })
        .collect()
}

fn network_tcp_applicability(_profile: &HardwareProfile, _usage: UsageProfile) -> Decision {
    Decision::Apply
}

fn network_tcp_actions(_profile: &HardwareProfile, _usage: UsageProfile) -> Vec<MutationAction> {
    let settings = [
        ("autotuninglevel=normal", "Set TCP window auto-tuning to normal"),
        ("rss=enabled", "Enable receive-side scaling"),
        ("heuristics=disabled", "Disable TCP heuristics"),
    ];
    settings
        .iter()
        .map(|(setting, description)| MutationAction {
            description: description.to_string(),
            kind: ActionKind::ShellCommand {
                program: "netsh".to_string(),
                args: vec![
                    "interface".to_string(),
                    "tcp".to_string(),
                    "set".to_string(),
                    "global".to_string(),
                    setting.to_string(),
                ],
            },
        })
        .collect()
}

/// Fixed, ordered catalog of tweaks. Built once at startup.
pub struct TweakRegistry {
    tweaks: Vec<Tweak>,
}

impl TweakRegistry {
    /// The built-in catalog, in its fixed registration order.
    pub fn builtin() -> Self {
        Self {
            tweaks: vec![
                Tweak {
                    name: "RegeditGaming",
                    applicability: regedit_gaming_applicability,
                    actions: regedit_gaming_actions,
                },
                Tweak {
                    name: "TimerResolution",
                    applicability: timer_resolution_applicability,
                    actions: timer_resolution_actions,
                },
                Tweak {
                    name: "Debloat",
                    applicability: debloat_applicability,
                    actions: debloat_actions,
                },
                Tweak {
                    name: "NetworkTcp",
                    applicability: network_tcp_applicability,
                    actions: network_tcp_actions,
                },
            ],
        }
    }

    /// Look a tweak up by name.
    pub fn get(&self, name: &str) -> Option<&Tweak> {
        self.tweaks.iter().find(|t| t.name == name)
    }

    /// Tweak names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.tweaks.iter().map(|t| t.name).collect()
    }

    /// Every config key any registered tweak could touch on this hardware,
    /// across all usage profiles. This is the snapshot capture set: one
    /// slot covers the whole session, not just the tweak being applied.
    pub fn config_keys(&self, profile: &HardwareProfile) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for tweak in &self.tweaks {
            for usage in [
                UsageProfile::Gaming,
                UsageProfile::Work,
                UsageProfile::ExtremeLatency,
            ] {
                for action in (tweak.actions)(profile, usage) {
                    keys.insert(action.config_key());
                }
            }
        }
        keys
    }
}

impl Default for TweakRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cores: usize, ram_gb: f64, disk: DiskType) -> HardwareProfile {
        HardwareProfile {
            cpu_cores: cores,
            cpu_threads: cores * 2,
            ram_total_gb: ram_gb,
            disk_type: disk,
            os_identity: "Windows 11".into(),
        }
    }

    #[test]
    fn test_registration_order() {
        let registry = TweakRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec!["RegeditGaming", "TimerResolution", "Debloat", "NetworkTcp"]
        );
    }

    #[test]
    fn test_unknown_name_not_found() {
        let registry = TweakRegistry::builtin();
        assert!(registry.get("Unknown").is_none());
    }

    #[test]
    fn test_regedit_gaming_skips_low_core_gaming() {
        let registry = TweakRegistry::builtin();
        let tweak = registry.get("RegeditGaming").unwrap();
        let p = profile(2, 16.0, DiskType::Ssd);
        match (tweak.applicability)(&p, UsageProfile::Gaming) {
            Decision::Skip(reason) => assert!(reason.contains("low core")),
            Decision::Apply => panic!("expected skip on a 2-core gaming box"),
        }
    }

    #[test]
    fn test_regedit_gaming_applies_elsewhere() {
        let registry = TweakRegistry::builtin();
        let tweak = registry.get("RegeditGaming").unwrap();
        let quad = profile(4, 16.0, DiskType::Ssd);
        assert_eq!((tweak.applicability)(&quad, UsageProfile::Gaming), Decision::Apply);
        // Low cores but non-gaming usage still applies
        let dual = profile(2, 16.0, DiskType::Ssd);
        assert_eq!((tweak.applicability)(&dual, UsageProfile::Work), Decision::Apply);
    }

    #[test]
    fn test_regedit_gaming_issues_two_registry_actions() {
        let registry = TweakRegistry::builtin();
        let tweak = registry.get("RegeditGaming").unwrap();
        let actions = (tweak.actions)(&profile(8, 16.0, DiskType::Ssd), UsageProfile::Gaming);
        assert_eq!(actions.len(), 2);
        assert!(actions
            .iter()
            .all(|a| matches!(a.kind, ActionKind::SetRegistryValue { .. })));
    }

    #[test]
    fn test_timer_resolution_skips_non_gaming() {
        let registry = TweakRegistry::builtin();
        let tweak = registry.get("TimerResolution").unwrap();
        let p = profile(8, 16.0, DiskType::Hdd);
        assert!(matches!(
            (tweak.applicability)(&p, UsageProfile::Work),
            Decision::Skip(_)
        ));
        assert!(matches!(
            (tweak.applicability)(&p, UsageProfile::ExtremeLatency),
            Decision::Skip(_)
        ));
    }

    #[test]
    fn test_timer_resolution_hdd_adds_defrag_action() {
        let registry = TweakRegistry::builtin();
        let tweak = registry.get("TimerResolution").unwrap();
        let hdd = (tweak.actions)(&profile(8, 16.0, DiskType::Hdd), UsageProfile::Gaming);
        let ssd = (tweak.actions)(&profile(8, 16.0, DiskType::Ssd), UsageProfile::Gaming);
        assert_eq!(hdd.len(), ssd.len() + 1);
        assert!(hdd.iter().any(|a| a.config_key().contains("ScheduledDefrag")));
        assert!(!ssd.iter().any(|a| a.config_key().contains("ScheduledDefrag")));
        // SystemRestore task disable is always present when applying
        for actions in [&hdd, &ssd] {
            assert!(actions.iter().any(|a| a.config_key().contains("SystemRestore")));
        }
    }

    #[test]
    fn test_debloat_gated_on_ram() {
        let registry = TweakRegistry::builtin();
        let tweak = registry.get("Debloat").unwrap();
        assert!(matches!(
            (tweak.applicability)(&profile(4, 8.0, DiskType::Ssd), UsageProfile::Gaming),
            Decision::Skip(_)
        ));
        assert_eq!(
            (tweak.applicability)(&profile(4, 4.0, DiskType::Ssd), UsageProfile::Gaming),
            Decision::Apply
        );
        let actions = (tweak.actions)(&profile(4, 4.0, DiskType::Ssd), UsageProfile::Gaming);
        assert_eq!(actions.len(), 3);
    }

    #[test]
    fn test_network_tcp_always_applies() {
        let registry = TweakRegistry::builtin();
        let tweak = registry.get("NetworkTcp").unwrap();
        for usage in [
            UsageProfile::Gaming,
            UsageProfile::Work,
            UsageProfile::ExtremeLatency,
        ] {
            assert_eq!(
                (tweak.applicability)(&profile(2, 4.0, DiskType::Hdd), usage),
                Decision::Apply
            );
        }
    }

    #[test]
    fn test_config_keys_cover_all_tweaks() {
        let registry = TweakRegistry::builtin();
        let keys = registry.config_keys(&profile(8, 16.0, DiskType::Hdd));
        assert!(keys.iter().any(|k| k.contains("SystemResponsiveness")));
        assert!(keys.iter().any(|k| k.contains("SystemRestore")));
        assert!(keys.iter().any(|k| k.contains("ScheduledDefrag")));
        assert!(keys.iter().any(|k| k.starts_with("appx:")));
        assert!(keys.iter().any(|k| k.starts_with("cmd:netsh")));
    }

    #[test]
    fn test_config_keys_ssd_excludes_defrag() {
        let registry = TweakRegistry::builtin();
        let keys = registry.config_keys(&profile(8, 16.0, DiskType::Ssd));
        assert!(!keys.iter().any(|k| k.contains("ScheduledDefrag")));
    }

    #[test]
    fn test_usage_profile_from_str() {
        assert_eq!("gaming".parse::<UsageProfile>().unwrap(), UsageProfile::Gaming);
        assert_eq!("Work".parse::<UsageProfile>().unwrap(), UsageProfile::Work);
        assert_eq!(
            "extreme-latency".parse::<UsageProfile>().unwrap(),
            UsageProfile::ExtremeLatency
        );
        assert!("turbo".parse::<UsageProfile>().is_err());
    }

    #[test]
    fn test_config_key_formats() {
        let action = MutationAction {
            description: "test".into(),
            kind: ActionKind::DisableScheduledTask {
                task: r"\Microsoft\Windows\SystemRestore\RV".into(),
            },
        };
        assert_eq!(action.config_key(), r"task:\Microsoft\Windows\SystemRestore\RV");
    }
}
