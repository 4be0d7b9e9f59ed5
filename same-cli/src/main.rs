//! `same-station`: command-line interface for the SAME/EAS monitoring and
//! activation station core.

mod config;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use same_core::audio_source::WavFileSource;
use same_core::audit::{AuditSink, NullAuditSink};
use same_core::broadcaster;
use same_core::config::{DedupConfig, JurisdictionConfig, MonitorConfig, PrefilterConfig};
use same_core::external_audio;
use same_core::gpio::{ActivationType, GpioController, NullGpioBackend};
use same_core::monitor::{self, AlertSink};
use same_core::protocol::SameHeader;
use same_core::selftest;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "same-station", about = "SAME/EAS monitoring and activation station")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a single audio file and print any headers found.
    Decode {
        /// Path to a WAV or MP3 recording.
        path: PathBuf,
        /// Working sample rate for the decoder.
        #[arg(long, default_value_t = 22050)]
        sample_rate: u32,
        /// Emit JSON instead of a human-readable summary.
        #[arg(long)]
        json: bool,
    },
    /// Run the continuous monitor against a live or file-based audio source.
    Monitor {
        /// TOML configuration file.
        #[arg(long)]
        config: PathBuf,
        /// WAV file to use as the audio source (for replay/testing).
        #[arg(long)]
        input: PathBuf,
    },
    /// Assemble and write a SAME broadcast WAV for a given header string.
    Broadcast {
        /// Raw SAME header text, e.g. `ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-`.
        header: String,
        /// Directory to write the archive WAV into.
        #[arg(long, default_value = "archive")]
        archive_dir: PathBuf,
        #[arg(long, default_value_t = 22050)]
        sample_rate: u32,
    },
    /// Run the decode -> dedup -> jurisdiction pipeline over a batch of
    /// reference audio files.
    Selftest {
        /// TOML configuration file.
        #[arg(long)]
        config: PathBuf,
        /// Audio files to test against.
        files: Vec<PathBuf>,
    },
    /// Exercise a GPIO pin's activation state machine without decoding
    /// any audio, for bench-testing wiring.
    GpioTest {
        pin: u8,
        #[arg(long, default_value_t = 5.0)]
        hold_seconds: f64,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Decode { path, sample_rate, json } => run_decode(&path, sample_rate, json),
        Command::Monitor { config, input } => run_monitor(&config, &input),
        Command::Broadcast {
            header,
            archive_dir,
            sample_rate,
        } => run_broadcast(&header, &archive_dir, sample_rate),
        Command::Selftest { config, files } => run_selftest(&config, &files),
        Command::GpioTest { pin, hold_seconds } => run_gpio_test(pin, hold_seconds),
    }
}

fn run_decode(path: &PathBuf, sample_rate: u32, json: bool) -> Result<()> {
    let samples = external_audio::load_and_resample(path, sample_rate)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let outcome = same_core::decoder::decode(&samples, sample_rate, &PrefilterConfig::default())
        .with_context(|| "decode failed")?;

    if json {
        let headers: Vec<_> = outcome
            .headers
            .iter()
            .map(|h| serde_json::json!({
                "raw_text": h.raw_text,
                "originator": h.originator,
                "event_code": h.event_code,
                "confidence": h.confidence,
            }))
            .collect();
        println!("{}", serde_json::json!({ "headers": headers, "eom_count": outcome.eom_count }));
    } else {
        for header in &outcome.headers {
            println!("{} (confidence {:.0}%)", header.raw_text, header.confidence * 100.0);
        }
        println!("EOM bursts: {}", outcome.eom_count);
    }

    Ok(())
}

struct PrintingAlertSink;

impl AlertSink for PrintingAlertSink {
    fn on_alert(&self, header: &SameHeader) {
        println!("ALERT: {header}");
    }
}

fn run_monitor(config_path: &PathBuf, input_path: &PathBuf) -> Result<()> {
    let cfg: MonitorConfig = config::load_config(config_path)?;
    let source = WavFileSource::open(input_path).with_context(|| format!("failed to open {}", input_path.display()))?;

    let audit: Arc<dyn AuditSink> = Arc::new(NullAuditSink);
    let sink: Arc<dyn AlertSink> = Arc::new(PrintingAlertSink);

    let handle = monitor::spawn(cfg, Box::new(source), sink, audit);
    std::thread::sleep(std::time::Duration::from_secs(30));
    let stats = handle.stats();
    handle.stop();

    println!(
        "scans: {} attempted, {} skipped, {} headers found, {} alerted, {} watchdog trips",
        stats.scans_attempted, stats.scans_skipped, stats.headers_found, stats.headers_alerted, stats.watchdog_trips
    );
    Ok(())
}

fn run_broadcast(header_text: &str, archive_dir: &PathBuf, sample_rate: u32) -> Result<()> {
    let header = SameHeader::parse(header_text).with_context(|| "invalid SAME header")?;
    let samples = broadcaster::assemble_broadcast(&header, None, sample_rate);
    let path = broadcaster::write_archive(archive_dir, &header, &samples, sample_rate)
        .with_context(|| "failed to write broadcast archive")?;
    println!("wrote {}", path.display());
    Ok(())
}

fn run_selftest(config_path: &PathBuf, files: &[PathBuf]) -> Result<()> {
    let cfg: MonitorConfig = config::load_config(config_path)?;
    let progress = indicatif::ProgressBar::new_spinner();
    progress.set_message(format!("decoding {} file(s)...", files.len()));
    progress.enable_steady_tick(std::time::Duration::from_millis(120));

    let report = selftest::run(
        files,
        cfg.station.sample_rate_hz,
        &cfg.prefilter,
        &cfg.jurisdiction,
        &DedupConfig::default(),
    );
    progress.finish_and_clear();

    for result in &report.results {
        println!(
            "{}: {:?} - {} (matched: [{}])",
            result.path.display(),
            result.status,
            result.reason,
            result.matched_fips_codes.join(", ")
        );
    }
    println!("{} passed, {} failed", report.pass_count(), report.fail_count());
    Ok(())
}

fn run_gpio_test(pin: u8, hold_seconds: f64) -> Result<()> {
    use same_core::config::GpioPinConfig;

    let pin_config = GpioPinConfig {
        pin,
        name: format!("test-pin-{pin}"),
        active_high: true,
        debounce_ms: 50,
        hold_seconds,
        watchdog_seconds: hold_seconds * 10.0,
        enabled: true,
    };
    let controller = GpioController::new(vec![pin_config], Arc::new(NullGpioBackend), Arc::new(NullAuditSink));
    controller
        .activate(pin, ActivationType::Test)
        .with_context(|| "activation failed")?;
    println!("pin {pin} activated, holding for {hold_seconds}s");
    std::thread::sleep(std::time::Duration::from_secs_f64(hold_seconds + 0.5));
    println!("pin {pin} state: {:?}", controller.state(pin));
    Ok(())
}
