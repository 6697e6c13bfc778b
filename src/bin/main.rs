//! CLI tool for Tunemark (tmark)

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use colored::Colorize;

#[cfg(feature = "cli")]
use tunelib::engine::{DecisionEngine, TweakOutcome};
#[cfg(feature = "cli")]
use tunelib::hardware::HardwareProfile;
#[cfg(feature = "cli")]
use tunelib::telemetry::{LatencySampler, PingSampler, TelemetrySampler};
#[cfg(feature = "cli")]
use tunelib::tweaks::executor::{ActionExecutor, DryRunExecutor, SystemExecutor};
#[cfg(feature = "cli")]
use tunelib::tweaks::UsageProfile;
#[cfg(feature = "cli")]
use tunelib::TunerConfig;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "tmark")]
#[command(about = "Tunemark: hardware-aware host tuning with a safety-snapshot rollback envelope", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Show the detected hardware profile
    Profile {
        /// Output format (json or text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// List the tweak catalog
    Tweaks,
    /// Evaluate and apply one tweak for a usage profile
    Apply {
        /// Tweak name (see `tmark tweaks`)
        name: String,
        /// Usage profile: gaming, work, or extreme-latency
        #[arg(short, long, default_value = "gaming")]
        usage: UsageProfile,
        /// Record the actions without touching the host
        #[arg(long)]
        dry_run: bool,
    },
    /// Revert the host to the safety snapshot
    Revert,
    /// Show safety snapshot status
    Status,
    /// Periodic telemetry monitor (Ctrl-C to stop)
    Monitor {
        /// Poll interval in seconds (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Ask a process to terminate
    Kill {
        /// Process ID
        pid: u32,
    },
    /// Print a sample configuration file
    Config,
}

#[cfg(feature = "cli")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::init();

    let config = match &cli.config {
        Some(path) => TunerConfig::from_toml_file(path)?,
        None => TunerConfig::default(),
    };

    match &cli.command {
        Commands::Profile { format } => handle_profile(format)?,
        Commands::Tweaks => handle_tweaks(&config),
        Commands::Apply {
            name,
            usage,
            dry_run,
        } => handle_apply(&config, name, *usage, *dry_run)?,
        Commands::Revert => handle_revert(&config)?,
        Commands::Status => handle_status(&config)?,
        Commands::Monitor { interval } => handle_monitor(&config, *interval)?,
        Commands::Kill { pid } => {
            let sampler = TelemetrySampler::new();
            match sampler.terminate(*pid) {
                Ok(()) => println!("{}", format!("Process {} signalled", pid).green()),
                Err(e) => {
                    eprintln!("{} {}", "error:".red(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Config => print!("{}", TunerConfig::sample_toml()),
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn handle_profile(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let profile = HardwareProfile::detect();
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("{}", "Hardware Profile".bold());
        println!("  CPU cores:   {}", profile.cpu_cores);
        println!("  CPU threads: {}", profile.cpu_threads);
        println!("  RAM total:   {:.1} GB", profile.ram_total_gb);
        println!("  Disk type:   {}", profile.disk_type);
        println!("  OS:          {}", profile.os_identity);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn handle_tweaks(config: &TunerConfig) {
    let engine = DecisionEngine::with_defaults(&config.snapshot_path, DryRunExecutor::new());
    println!("{}", "Available tweaks".bold());
    for name in engine.list_tweak_names() {
        println!("  {}", name);
    }
}

#[cfg(feature = "cli")]
fn handle_apply(
    config: &TunerConfig,
    name: &str,
    usage: UsageProfile,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = HardwareProfile::detect();
    let executor: Box<dyn ActionExecutor> = if dry_run {
        Box::new(DryRunExecutor::new())
    } else {
        Box::new(SystemExecutor::new())
    };
    let mut engine = DecisionEngine::with_defaults(&config.snapshot_path, executor);
    if dry_run {
        // A dry run must not occupy the snapshot slot with placeholders
        engine = engine.without_snapshot_capture();
    }

    let report = engine.evaluate(name, &profile, usage)?;
    match &report.outcome {
        TweakOutcome::Applied { action_results } => {
            let line = if report.fully_applied() {
                report.message.green()
            } else {
                report.message.yellow()
            };
            println!("{}", line);
            for (index, ok) in action_results.iter().enumerate() {
                let marker = if *ok { "ok".green() } else { "failed".red() };
                println!("  action {}: {}", index + 1, marker);
            }
        }
        TweakOutcome::Skipped { .. } => println!("{}", report.message.yellow()),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn handle_revert(config: &TunerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine =
        DecisionEngine::with_defaults(&config.snapshot_path, SystemExecutor::new());
    match engine.revert_snapshot() {
        Ok(()) => {
            println!("{}", "Reverted to safety snapshot".green());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn handle_status(config: &TunerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = DecisionEngine::with_defaults(&config.snapshot_path, DryRunExecutor::new());
    match engine.describe_snapshot()? {
        Some(info) => {
            println!("{}", "Safety snapshot present".bold());
            println!("  taken: {}", info.timestamp);
            println!(
                "  host:  {} cores / {:.1} GB / {} / {}",
                info.profile.cpu_cores,
                info.profile.ram_total_gb,
                info.profile.disk_type,
                info.profile.os_identity
            );
        }
        None => println!("No safety snapshot"),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn handle_monitor(
    config: &TunerConfig,
    interval: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = std::time::Duration::from_secs(
        interval.unwrap_or(config.poll_interval_secs).max(1),
    );
    let mut sampler = TelemetrySampler::new();
    let mut ping = PingSampler::new(config.ping_host.clone(), config.ping_timeout_secs);

    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, std::sync::atomic::Ordering::SeqCst);
    })?;

    println!(
        "Polling every {}s, Ctrl-C to stop",
        interval.as_secs()
    );
    while running.load(std::sync::atomic::Ordering::SeqCst) {
        let overview = sampler.overview();
        let network = sampler.network();
        let latency = ping
            .sample()
            .map(|reading| format!("{:.1} ms", reading.rtt_ms))
            .unwrap_or_else(|| "n/a".to_string());

        println!(
            "cpu {:>5.1}%  ram {:>5.1}% ({:.1}/{:.1} GB)  disk {:>5.1}%  net {:.1}/{:.1} KB/s  ping {}",
            overview.cpu_percent,
            overview.ram_percent,
            overview.ram_used_gb,
            overview.ram_total_gb,
            overview.disk_percent,
            network.sent_kbps,
            network.recv_kbps,
            latency
        );

        for process in sampler.top_processes(config.top_process_limit.min(5)) {
            println!(
                "    {:>7}  {:<24} {:>8.1} MB",
                process.pid,
                process.name,
                process.rss_bytes as f64 / (1024.0 * 1024.0)
            );
        }

        std::thread::sleep(interval);
    }
    println!("stopped");
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}
