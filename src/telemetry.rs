//! Host telemetry sampling — overview metrics, network rates, top
//! processes, ping latency.
//!
//! Independent of the decision engine: the sampler owns its own counters
//! and shares nothing with the engine beyond read-only hardware profile
//! values. A presentation layer polls it periodically from its own thread.
//!
//! Rate metrics (CPU percent, network throughput) are derived from counter
//! deltas between calls, so the first call after construction reports zero.
//!
//! # Platform Support
//!
//! - **Linux**: `/proc/stat`, `/proc/meminfo`, `/proc/uptime`,
//!   `/proc/net/dev`, `/proc/<pid>/`, statvfs
//! - **Other**: documented zero defaults; process termination via
//!   `taskkill` on Windows

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TunemarkError};

/// One overview poll: CPU, RAM, disk, uptime.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewSample {
    /// Whole-system CPU utilization percent (0 on first call)
    pub cpu_percent: f32,
    /// RAM utilization percent
    pub ram_percent: f32,
    pub ram_used_gb: f64,
    pub ram_total_gb: f64,
    /// Root filesystem utilization percent
    pub disk_percent: f32,
    /// Seconds since boot
    pub uptime_secs: u64,
    /// OS name and release
    pub os_identity: String,
}

/// One network poll: rates since the previous call plus cumulative volume.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSample {
    pub sent_kbps: f64,
    pub recv_kbps: f64,
    /// Total bytes moved since boot, in MB
    pub total_mb: f64,
}

/// One process row, for top-by-memory listings.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub rss_bytes: u64,
}

/// A timestamped round-trip latency reading.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyReading {
    pub timestamp: DateTime<Utc>,
    pub rtt_ms: f64,
}

/// Pluggable latency source. The engine never depends on this; it exists so
/// a presentation layer can show real measured latency instead of invented
/// numbers.
pub trait LatencySampler {
    /// Take one reading. `None` when the probe failed or timed out.
    fn sample(&mut self) -> Option<LatencyReading>;
}

/// `LatencySampler` backed by the system `ping` binary.
pub struct PingSampler {
    host: String,
    timeout_secs: u64,
}

impl PingSampler {
    pub fn new(host: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            host: host.into(),
            timeout_secs: timeout_secs.max(1),
        }
    }

    /// Extract the RTT in ms from ping output. Handles the Unix
    /// `time=12.3 ms` form and the Windows `Average = 12ms` form.
    fn parse_rtt_ms(output: &str) -> Option<f64> {
        if let Some(pos) = output.find("time=") {
            let rest = &output[pos + 5..];
            let end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            return rest[..end].parse().ok();
        }
        if let Some(pos) = output.find("Average = ") {
            let rest = &output[pos + 10..];
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            return rest[..end].parse().ok();
        }
        None
    }
}

impl LatencySampler for PingSampler {
    fn sample(&mut self) -> Option<LatencyReading> {
        let output = if cfg!(windows) {
            std::process::Command::new("ping")
                .args(["-n", "1", "-w", &(self.timeout_secs * 1000).to_string(), &self.host])
                .output()
        } else {
            std::process::Command::new("ping")
                .args(["-c", "1", "-W", &self.timeout_secs.to_string(), &self.host])
                .output()
        };

        let output = match output {
            Ok(out) if out.status.success() => out,
            Ok(_) | Err(_) => {
                log::debug!("Ping probe to {} failed", self.host);
                return None;
            }
        };

        let text = String::from_utf8_lossy(&output.stdout);
        Self::parse_rtt_ms(&text).map(|rtt_ms| LatencyReading {
            timestamp: Utc::now(),
            rtt_ms,
        })
    }
}

/// Stateful periodic sampler.
pub struct TelemetrySampler {
    prev_cpu: Option<(u64, u64)>,
    prev_net: Option<(u64, u64, Instant)>,
}

impl TelemetrySampler {
    pub fn new() -> Self {
        Self {
            prev_cpu: None,
            prev_net: None,
        }
    }

    /// Poll CPU, RAM, disk, and uptime.
    pub fn overview(&mut self) -> OverviewSample {
        let cpu_percent = self.cpu_percent();
        let (ram_total_gb, ram_used_gb) = Self::read_ram();
        let ram_percent = if ram_total_gb > 0.0 {
            (ram_used_gb / ram_total_gb * 100.0) as f32
        } else {
            0.0
        };

        OverviewSample {
            cpu_percent,
            ram_percent,
            ram_used_gb,
            ram_total_gb,
            disk_percent: Self::read_disk_percent(),
            uptime_secs: Self::read_uptime_secs(),
            os_identity: crate::hardware::HardwareProfile::os_identity(),
        }
    }

    /// Poll network throughput. First call reports zero rates.
    pub fn network(&mut self) -> NetworkSample {
        let Some((sent, recv)) = Self::read_net_counters() else {
            return NetworkSample {
                sent_kbps: 0.0,
                recv_kbps: 0.0,
                total_mb: 0.0,
            };
        };
        let now = Instant::now();
        let total_mb = (sent + recv) as f64 / (1024.0 * 1024.0);

        let sample = match self.prev_net {
            Some((prev_sent, prev_recv, prev_at)) => {
                let elapsed = now.duration_since(prev_at).as_secs_f64().max(0.001);
                NetworkSample {
                    sent_kbps: sent.saturating_sub(prev_sent) as f64 / elapsed / 1024.0,
                    recv_kbps: recv.saturating_sub(prev_recv) as f64 / elapsed / 1024.0,
                    total_mb,
                }
            }
            None => NetworkSample {
                sent_kbps: 0.0,
                recv_kbps: 0.0,
                total_mb,
            },
        };
        self.prev_net = Some((sent, recv, now));
        sample
    }

    /// Processes sorted by resident memory, descending.
    pub fn top_processes(&self, limit: usize) -> Vec<ProcessSample> {
        let mut processes = Self::read_processes();
        processes.sort_by(|a, b| b.rss_bytes.cmp(&a.rss_bytes));
        processes.truncate(limit);
        processes
    }

    /// Ask a process to terminate.
    #[cfg(unix)]
    pub fn terminate(&self, pid: u32) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            .map_err(|e| TunemarkError::Process(format!("cannot terminate {}: {}", pid, e)))
    }

    #[cfg(windows)]
    pub fn terminate(&self, pid: u32) -> Result<()> {
        let output = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string()])
            .output()
            .map_err(|e| TunemarkError::Process(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TunemarkError::Process(format!(
                "cannot terminate {}: {}",
                pid,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    #[cfg(not(any(unix, windows)))]
    pub fn terminate(&self, pid: u32) -> Result<()> {
        Err(TunemarkError::UnsupportedPlatform(format!(
            "process termination unavailable for pid {}",
            pid
        )))
    }

    fn cpu_percent(&mut self) -> f32 {
        let Some((idle, total)) = Self::read_cpu_counters() else {
            return 0.0;
        };
        let percent = match self.prev_cpu {
            Some((prev_idle, prev_total)) => {
                let total_delta = total.saturating_sub(prev_total);
                let idle_delta = idle.saturating_sub(prev_idle);
                if total_delta == 0 {
                    0.0
                } else {
                    (1.0 - idle_delta as f64 / total_delta as f64) as f32 * 100.0
                }
            }
            None => 0.0,
        };
        self.prev_cpu = Some((idle, total));
        percent
    }

    #[cfg(target_os = "linux")]
    fn read_cpu_counters() -> Option<(u64, u64)> {
        let stat = std::fs::read_to_string("/proc/stat").ok()?;
        let line = stat.lines().next()?;
        Self::parse_cpu_line(line)
    }

    /// `cpu  user nice system idle iowait irq softirq steal ...` →
    /// (idle + iowait, sum of all fields)
    fn parse_cpu_line(line: &str) -> Option<(u64, u64)> {
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .filter_map(|v| v.parse().ok())
            .collect();
        if fields.len() < 5 {
            return None;
        }
        let idle = fields[3] + fields[4];
        let total: u64 = fields.iter().sum();
        Some((idle, total))
    }

    #[cfg(not(target_os = "linux"))]
    fn read_cpu_counters() -> Option<(u64, u64)> {
        None
    }

    #[cfg(target_os = "linux")]
    fn read_ram() -> (f64, f64) {
        let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") else {
            return (0.0, 0.0);
        };
        let kb = |prefix: &str| -> Option<f64> {
            meminfo.lines().find_map(|line| {
                line.strip_prefix(prefix)?
                    .trim()
                    .trim_end_matches("kB")
                    .trim()
                    .parse::<f64>()
                    .ok()
            })
        };
        let total_gb = kb("MemTotal:").unwrap_or(0.0) / (1024.0 * 1024.0);
        let available_gb = kb("MemAvailable:").unwrap_or(0.0) / (1024.0 * 1024.0);
        (total_gb, (total_gb - available_gb).max(0.0))
    }

    #[cfg(not(target_os = "linux"))]
    fn read_ram() -> (f64, f64) {
        (0.0, 0.0)
    }

    #[cfg(unix)]
    fn read_disk_percent() -> f32 {
        match nix::sys::statvfs::statvfs("/") {
            Ok(stat) => {
                let total = stat.blocks() as u64 * stat.fragment_size() as u64;
                let free = stat.blocks_available() as u64 * stat.fragment_size() as u64;
                if total == 0 {
                    0.0
                } else {
                    ((total - free) as f64 / total as f64 * 100.0) as f32
                }
            }
            Err(e) => {
                log::debug!("statvfs(/) failed: {}", e);
                0.0
            }
        }
    }

    #[cfg(not(unix))]
    fn read_disk_percent() -> f32 {
        0.0
    }

    #[cfg(target_os = "linux")]
    fn read_uptime_secs() -> u64 {
        std::fs::read_to_string("/proc/uptime")
            .ok()
            .and_then(|s| s.split_whitespace().next()?.parse::<f64>().ok())
            .map(|secs| secs as u64)
            .unwrap_or(0)
    }

    #[cfg(not(target_os = "linux"))]
    fn read_uptime_secs() -> u64 {
        0
    }

    #[cfg(target_os = "linux")]
    fn read_net_counters() -> Option<(u64, u64)> {
        let dev = std::fs::read_to_string("/proc/net/dev").ok()?;
        Some(Self::parse_net_dev(&dev))
    }

    /// Sum tx/rx byte counters across interfaces, loopback excluded.
    fn parse_net_dev(dev: &str) -> (u64, u64) {
        let mut sent = 0u64;
        let mut recv = 0u64;
        for line in dev.lines().skip(2) {
            let Some((name, counters)) = line.split_once(':') else {
                continue;
            };
            if name.trim() == "lo" {
                continue;
            }
            let fields: Vec<u64> = counters
                .split_whitespace()
                .filter_map(|v| v.parse().ok())
                .collect();
            // rx bytes is field 0, tx bytes is field 8
            if fields.len() > 8 {
                recv += fields[0];
                sent += fields[8];
            }
        }
        (sent, recv)
    }

    #[cfg(not(target_os = "linux"))]
    fn read_net_counters() -> Option<(u64, u64)> {
        None
    }

    #[cfg(target_os = "linux")]
    fn read_processes() -> Vec<ProcessSample> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) }.max(0) as u64;
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return Vec::new();
        };

        let mut processes = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Ok(pid) = name.to_string_lossy().parse::<u32>() else {
                continue;
            };
            let Ok(statm) = std::fs::read_to_string(entry.path().join("statm")) else {
                continue;
            };
            let rss_pages: u64 = statm
                .split_whitespace()
                .nth(1)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let comm = std::fs::read_to_string(entry.path().join("comm"))
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            processes.push(ProcessSample {
                pid,
                name: comm,
                rss_bytes: rss_pages * page_size,
            });
        }
        processes
    }

    #[cfg(not(target_os = "linux"))]
    fn read_processes() -> Vec<ProcessSample> {
        Vec::new()
    }
}

impl Default for TelemetrySampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rtt_unix_format() {
        let output = "64 bytes from 8.8.8.8: icmp_seq=1 ttl=116 time=11.8 ms";
        assert_eq!(PingSampler::parse_rtt_ms(output), Some(11.8));
    }

    #[test]
    fn test_parse_rtt_windows_format() {
        let output = "    Minimum = 11ms, Maximum = 13ms, Average = 12ms";
        assert_eq!(PingSampler::parse_rtt_ms(output), Some(12.0));
    }

    #[test]
    fn test_parse_rtt_garbage_is_none() {
        assert_eq!(PingSampler::parse_rtt_ms("Request timed out."), None);
        assert_eq!(PingSampler::parse_rtt_ms(""), None);
    }

    #[test]
    fn test_parse_cpu_line() {
        let line = "cpu  100 0 50 800 50 0 0 0 0 0";
        let (idle, total) = TelemetrySampler::parse_cpu_line(line).unwrap();
        assert_eq!(idle, 850);
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_parse_cpu_line_short_is_none() {
        assert!(TelemetrySampler::parse_cpu_line("cpu 1 2").is_none());
    }

    #[test]
    fn test_parse_net_dev_skips_loopback() {
        let dev = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  999999    100    0    0    0     0          0         0   999999    100    0    0    0     0       0          0
  eth0:    2048     10    0    0    0     0          0         0     1024      8    0    0    0     0       0          0";
        let (sent, recv) = TelemetrySampler::parse_net_dev(dev);
        assert_eq!(recv, 2048);
        assert_eq!(sent, 1024);
    }

    #[test]
    fn test_first_network_sample_has_zero_rates() {
        let mut sampler = TelemetrySampler::new();
        let sample = sampler.network();
        assert_eq!(sample.sent_kbps, 0.0);
        assert_eq!(sample.recv_kbps, 0.0);
    }

    #[test]
    fn test_first_overview_cpu_is_zero() {
        let mut sampler = TelemetrySampler::new();
        let sample = sampler.overview();
        assert_eq!(sample.cpu_percent, 0.0);
        assert!(sample.ram_percent >= 0.0 && sample.ram_percent <= 100.0);
        assert!(!sample.os_identity.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_top_processes_sorted_and_limited() {
        let sampler = TelemetrySampler::new();
        let top = sampler.top_processes(5);
        assert!(top.len() <= 5);
        for pair in top.windows(2) {
            assert!(pair[0].rss_bytes >= pair[1].rss_bytes);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_nonexistent_pid_errors() {
        let sampler = TelemetrySampler::new();
        // PID near the kernel max is essentially never in use
        let err = sampler.terminate(4_000_000).unwrap_err();
        assert!(err.to_string().contains("Process error"));
    }
}
