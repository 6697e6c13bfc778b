//! Decision engine — evaluates tweak applicability against the hardware and
//! usage profiles and issues mutation actions inside the safety envelope.
//!
//! Every evaluation is independent: predicate first, then (on `Apply`) a
//! snapshot is guaranteed to exist before any action is issued, then the
//! tweak's actions run to completion with per-action success collected. A
//! tweak counts as failed if any of its actions failed, but remaining
//! actions still run; there is no partial rollback of a single tweak's own
//! actions and no dedupe of repeated applications.
//!
//! # Concurrency
//!
//! Synchronous and internally lock-free. A host application calling
//! `evaluate`/`create_snapshot`/`revert_snapshot` from multiple threads must
//! serialize those calls itself (one worker, or a mutex around the engine);
//! otherwise the single snapshot slot is subject to lost updates.
//!
//! # Examples
//!
//! ```
//! use tunelib::engine::DecisionEngine;
//! use tunelib::hardware::HardwareProfile;
//! use tunelib::tweaks::executor::DryRunExecutor;
//! use tunelib::tweaks::UsageProfile;
//!
//! let profile = HardwareProfile::detect();
//! let mut engine = DecisionEngine::with_defaults(
//!     std::env::temp_dir().join("doc_snapshot.json"),
//!     DryRunExecutor::new(),
//! );
//! let report = engine
//!     .evaluate("TimerResolution", &profile, UsageProfile::Work)
//!     .unwrap();
//! println!("{}", report.message);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::hardware::HardwareProfile;
use crate::snapshot::{SnapshotInfo, SnapshotStore};
use crate::tweaks::executor::{ActionExecutor, UNCAPTURED_VALUE};
use crate::tweaks::{Decision, TweakRegistry, UsageProfile};

/// Terminal state of one tweak evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TweakOutcome {
    /// The predicate allowed the tweak; actions were issued. One success
    /// flag per action, in issue order.
    Applied { action_results: Vec<bool> },
    /// The predicate (or an unrecognized name) blocked the tweak; nothing
    /// was issued.
    Skipped { reason: String },
}

/// Report for one evaluation. `Applied` and `Skipped` are distinct report
/// classes; the message framing reflects which one occurred.
#[derive(Debug, Clone, Serialize)]
pub struct TweakReport {
    /// Tweak name as requested
    pub tweak: String,
    pub outcome: TweakOutcome,
    /// Operator-facing one-liner
    pub message: String,
}

impl TweakReport {
    /// True only for an applied tweak whose actions all succeeded.
    pub fn fully_applied(&self) -> bool {
        match &self.outcome {
            TweakOutcome::Applied { action_results } => action_results.iter().all(|ok| *ok),
            TweakOutcome::Skipped { .. } => false,
        }
    }
}

/// The core engine: tweak catalog + snapshot store + injected executor.
pub struct DecisionEngine<E: ActionExecutor> {
    registry: TweakRegistry,
    store: SnapshotStore,
    executor: E,
    capture_snapshot: bool,
}

impl<E: ActionExecutor> DecisionEngine<E> {
    pub fn new(registry: TweakRegistry, store: SnapshotStore, executor: E) -> Self {
        Self {
            registry,
            store,
            executor,
            capture_snapshot: true,
        }
    }

    /// Engine over the built-in catalog with a snapshot slot at `path`.
    pub fn with_defaults<P: AsRef<Path>>(path: P, executor: E) -> Self {
        Self::new(TweakRegistry::builtin(), SnapshotStore::new(path), executor)
    }

    /// Disable automatic snapshot capture during `evaluate`. For dry runs:
    /// no host state changes, and persisting a placeholder-only slot would
    /// stop a later real apply from capturing actual pre-change values.
    pub fn without_snapshot_capture(mut self) -> Self {
        self.capture_snapshot = false;
        self
    }

    /// Tweak names in registration order.
    pub fn list_tweak_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Evaluate one tweak. See the module docs for the state machine.
    pub fn evaluate(
        &mut self,
        name: &str,
        profile: &HardwareProfile,
        usage: UsageProfile,
    ) -> Result<TweakReport> {
        let (applicability, actions_fn) = match self.registry.get(name) {
            Some(tweak) => (tweak.applicability, tweak.actions),
            None => {
                log::warn!("Tweak '{}' not recognized", name);
                return Ok(TweakReport {
                    tweak: name.to_string(),
                    outcome: TweakOutcome::Skipped {
                        reason: "not recognized".to_string(),
                    },
                    message: format!("{}: skipped, tweak not recognized", name),
                });
            }
        };

        match applicability(profile, usage) {
            Decision::Skip(reason) => {
                log::info!("{}: skipped ({})", name, reason);
                let message = format!("{}: skipped, {}", name, reason);
                Ok(TweakReport {
                    tweak: name.to_string(),
                    outcome: TweakOutcome::Skipped { reason },
                    message,
                })
            }
            Decision::Apply => {
                // Safety envelope: a snapshot must exist before the first
                // mutation of a session.
                if self.capture_snapshot && !self.store.exists() {
                    self.create_snapshot(profile)?;
                }

                let actions = actions_fn(profile, usage);
                let mut action_results = Vec::with_capacity(actions.len());
                for action in &actions {
                    match self.executor.execute(action) {
                        Ok(()) => action_results.push(true),
                        Err(e) => {
                            log::warn!("{}: action '{}' failed: {}", name, action.description, e);
                            action_results.push(false);
                        }
                    }
                }

                let failed = action_results.iter().filter(|ok| !**ok).count();
                let message = if failed == 0 {
                    format!("{}: applied, {} actions succeeded", name, actions.len())
                } else {
                    format!(
                        "{}: applied with errors, {} of {} actions failed",
                        name,
                        failed,
                        actions.len()
                    )
                };
                log::info!("{}", message);
                Ok(TweakReport {
                    tweak: name.to_string(),
                    outcome: TweakOutcome::Applied { action_results },
                    message,
                })
            }
        }
    }

    /// Capture a snapshot now, overwriting any existing one. The backup
    /// records the pre-change value of every config key any registered
    /// tweak could touch on this hardware, read through the executor;
    /// unreadable keys record a placeholder.
    pub fn create_snapshot(&mut self, profile: &HardwareProfile) -> Result<DateTime<Utc>> {
        let mut backed_up_state = BTreeMap::new();
        for key in self.registry.config_keys(profile) {
            let value = self
                .executor
                .read_key(&key)
                .unwrap_or_else(|| UNCAPTURED_VALUE.to_string());
            backed_up_state.insert(key, value);
        }
        self.store.create(profile, backed_up_state)
    }

    pub fn snapshot_exists(&self) -> bool {
        self.store.exists()
    }

    /// Restore every backed-up config key and consume the snapshot.
    pub fn revert_snapshot(&mut self) -> Result<()> {
        self.store.revert(&mut self.executor)
    }

    pub fn describe_snapshot(&self) -> Result<Option<SnapshotInfo>> {
        self.store.describe()
    }

    /// Borrow the executor (dry-run inspection, tests).
    pub fn executor(&self) -> &E {
        &self.executor
    }
}
