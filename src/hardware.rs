//! Hardware profile detection — core/thread counts, RAM size, disk type,
//! OS identity.
//!
//! The profile is the read-only input to every applicability predicate in
//! the decision engine, so detection is deliberately infallible: an OS query
//! that fails substitutes a documented default and logs a warning instead of
//! propagating an error.
//!
//! # Platform Support
//!
//! - **Linux**: `/proc/cpuinfo`, `/proc/meminfo`, `/sys/block/*/queue/rotational`
//! - **Other**: `num_cpus` counts plus documented defaults
//!
//! # Examples
//!
//! ```
//! use tunelib::hardware::HardwareProfile;
//!
//! let profile = HardwareProfile::detect();
//! println!("{} cores / {} threads", profile.cpu_cores, profile.cpu_threads);
//! println!("RAM: {:.1} GB, disk: {:?}", profile.ram_total_gb, profile.disk_type);
//! ```

use serde::{Deserialize, Serialize};

/// Primary disk technology, as far as the host exposes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskType {
    Ssd,
    Hdd,
}

impl std::fmt::Display for DiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ssd => write!(f, "SSD"),
            Self::Hdd => write!(f, "HDD"),
        }
    }
}

/// Immutable snapshot of host capability facts.
///
/// Built once per process lifetime (or on explicit re-detect). Fields are
/// plain data and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Physical core count
    pub cpu_cores: usize,
    /// Logical thread count
    pub cpu_threads: usize,
    /// Total installed RAM in GB (0.0 when unreadable)
    pub ram_total_gb: f64,
    /// Primary disk technology (SSD assumed when undetectable)
    pub disk_type: DiskType,
    /// OS name and release, e.g. "Linux 6.8.0"
    pub os_identity: String,
}

impl HardwareProfile {
    /// Detect the host hardware profile.
    ///
    /// Never fails: each field falls back to a documented default when the
    /// underlying query is unavailable (threads from `num_cpus`, RAM 0.0,
    /// disk SSD, OS identity from compile-time target).
    pub fn detect() -> Self {
        let cpu_threads = num_cpus::get();
        let cpu_cores = num_cpus::get_physical();

        let ram_total_gb = match Self::read_ram_total_gb() {
            Some(gb) => gb,
            None => {
                log::warn!("Total RAM unreadable, recording 0.0 GB");
                0.0
            }
        };

        let disk_type = match Self::read_disk_type() {
            Some(kind) => kind,
            None => {
                log::warn!("Disk type undetectable, assuming SSD");
                DiskType::Ssd
            }
        };

        Self {
            cpu_cores,
            cpu_threads,
            ram_total_gb,
            disk_type,
            os_identity: Self::os_identity(),
        }
    }

    /// OS name and release string, also reported in telemetry overviews.
    pub fn os_identity() -> String {
        Self::read_os_identity()
    }

    #[cfg(target_os = "linux")]
    fn read_ram_total_gb() -> Option<f64> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        for line in meminfo.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                let kb: f64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
                return Some(kb / (1024.0 * 1024.0));
            }
        }
        None
    }

    #[cfg(not(target_os = "linux"))]
    fn read_ram_total_gb() -> Option<f64> {
        None
    }

    /// Linux: a block device advertising `rotational = 1` is spinning rust.
    /// Virtual devices (loop, ram, zram, dm) are ignored.
    #[cfg(target_os = "linux")]
    fn read_disk_type() -> Option<DiskType> {
        let entries = std::fs::read_dir("/sys/block").ok()?;
        let mut saw_device = false;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("loop")
                || name.starts_with("ram")
                || name.starts_with("zram")
                || name.starts_with("dm-")
            {
                continue;
            }
            let rotational_path = entry.path().join("queue/rotational");
            if let Ok(value) = std::fs::read_to_string(&rotational_path) {
                saw_device = true;
                if value.trim() == "1" {
                    return Some(DiskType::Hdd);
                }
            }
        }
        if saw_device {
            Some(DiskType::Ssd)
        } else {
            None
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn read_disk_type() -> Option<DiskType> {
        None
    }

    fn read_os_identity() -> String {
        #[cfg(unix)]
        {
            if let Ok(output) = std::process::Command::new("uname").arg("-sr").output() {
                let identity = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !identity.is_empty() {
                    return identity;
                }
            }
        }
        std::env::consts::OS.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_never_panics() {
        let profile = HardwareProfile::detect();
        assert!(profile.cpu_threads >= 1);
        assert!(profile.cpu_cores >= 1);
        assert!(profile.cpu_threads >= profile.cpu_cores);
        assert!(!profile.os_identity.is_empty());
    }

    #[test]
    fn test_ram_is_non_negative() {
        let profile = HardwareProfile::detect();
        assert!(profile.ram_total_gb >= 0.0);
    }

    #[test]
    fn test_disk_type_display() {
        assert_eq!(DiskType::Ssd.to_string(), "SSD");
        assert_eq!(DiskType::Hdd.to_string(), "HDD");
    }

    #[test]
    fn test_profile_serialization_round_trip() {
        let profile = HardwareProfile {
            cpu_cores: 4,
            cpu_threads: 8,
            ram_total_gb: 15.9,
            disk_type: DiskType::Hdd,
            os_identity: "Linux 6.8.0".into(),
        };
        let json = serde_json::to_string(&profile).unwrap();
        let back: HardwareProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
