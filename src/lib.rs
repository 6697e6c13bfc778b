//! # Tunemark
//!
//! Hardware-aware host tuning with a safety-snapshot rollback envelope.
//!
//! Tunemark samples host telemetry and conditionally applies OS-level
//! configuration tweaks based on an immutable [`hardware::HardwareProfile`]
//! and an operator-selected [`tweaks::UsageProfile`]. Every mutation passes
//! through the [`engine::DecisionEngine`], which guarantees a single-slot
//! [`snapshot::SafetySnapshot`] exists before the first change of a session
//! and can revert the host to it on demand.
//!
//! Mutations themselves are issued through the injectable
//! [`tweaks::executor::ActionExecutor`] seam, so the engine is fully
//! testable without a real OS target and the CLI can offer a dry-run mode.
//!
//! ```
//! use tunelib::engine::DecisionEngine;
//! use tunelib::hardware::HardwareProfile;
//! use tunelib::tweaks::executor::DryRunExecutor;
//! use tunelib::tweaks::UsageProfile;
//!
//! let profile = HardwareProfile::detect();
//! let mut engine = DecisionEngine::with_defaults(
//!     std::env::temp_dir().join("lib_doc_snapshot.json"),
//!     DryRunExecutor::new(),
//! );
//! for name in engine.list_tweak_names() {
//!     let report = engine.evaluate(name, &profile, UsageProfile::Gaming).unwrap();
//!     println!("{}", report.message);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod snapshot;
pub mod telemetry;
pub mod tweaks;

pub use config::TunerConfig;
pub use engine::{DecisionEngine, TweakOutcome, TweakReport};
pub use error::{Result, TunemarkError};
pub use hardware::{DiskType, HardwareProfile};
pub use snapshot::{SafetySnapshot, SnapshotInfo, SnapshotStore};
pub use tweaks::executor::{ActionExecutor, DryRunExecutor, SystemExecutor};
pub use tweaks::{Decision, MutationAction, TweakRegistry, UsageProfile};
