//! Plain serde configuration structs with sensible defaults. Loading,
//! merging and TOML-include handling lives in the `same-cli` crate; this
//! module only defines the shapes and their defaults, the way library
//! consumers embedding `same-core` outside the CLI would want them.

use serde::{Deserialize, Serialize};

/// Tunable thresholds for the pre-filter energy gate (`crate::dsp::PrefilterGate`).
/// Exposed rather than hard-coded, per the pre-filter Open Question resolution
/// recorded in `DESIGN.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    /// FFT/Goertzel analysis window, in samples.
    pub window_size: usize,
    /// Minimum combined mark+space energy required to hand a scan window
    /// to the full decoder.
    pub energy_threshold: f32,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            window_size: 512,
            energy_threshold: 0.0005,
        }
    }
}

/// GPIO pin configuration, one per physical activation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioPinConfig {
    pub pin: u8,
    pub name: String,
    pub active_high: bool,
    pub debounce_ms: u64,
    pub hold_seconds: f64,
    pub watchdog_seconds: f64,
    pub enabled: bool,
}

impl Default for GpioPinConfig {
    fn default() -> Self {
        Self {
            pin: 0,
            name: String::new(),
            active_high: true,
            debounce_ms: 50,
            hold_seconds: 5.0,
            watchdog_seconds: 300.0,
            enabled: true,
        }
    }
}

/// Jurisdiction matching configuration: which FIPS/SAME codes this station
/// cares about, and whether nationwide/statewide wildcards should be honored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JurisdictionConfig {
    pub local_codes: Vec<String>,
    pub honor_nationwide_wildcard: bool,
    pub honor_statewide_wildcard: bool,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self {
            local_codes: Vec::new(),
            honor_nationwide_wildcard: true,
            honor_statewide_wildcard: true,
        }
    }
}

/// Station identity fields used when assembling outbound broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub callsign: String,
    pub originator: String,
    pub sample_rate_hz: u32,
    pub archive_dir: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            callsign: "WXYZ/FM".to_string(),
            originator: "EAS".to_string(),
            sample_rate_hz: 22050,
            archive_dir: "archive".to_string(),
        }
    }
}

/// Self-tuning scan scheduler parameters for the continuous monitor, per
/// the constants named in `SPEC_FULL.md` §5.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSchedulerConfig {
    pub scan_buffer_factor: f64,
    pub max_dynamic_scans: usize,
    pub min_scan_interval_secs: f64,
    pub adjustment_cooldown_secs: f64,
    pub high_skip_rate: f64,
    pub watchdog_stall_secs: f64,
    pub watchdog_poll_secs: f64,
}

impl Default for ScanSchedulerConfig {
    fn default() -> Self {
        Self {
            scan_buffer_factor: 1.15,
            max_dynamic_scans: 8,
            min_scan_interval_secs: 1.5,
            adjustment_cooldown_secs: 30.0,
            high_skip_rate: 0.05,
            watchdog_stall_secs: 60.0,
            watchdog_poll_secs: 10.0,
        }
    }
}

/// Duplicate-suppression cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub cooldown_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { cooldown_secs: 30 }
    }
}

/// Top-level continuous monitor configuration, tying the above together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub station: StationConfig,
    pub jurisdiction: JurisdictionConfig,
    pub prefilter: PrefilterConfig,
    pub scheduler: ScanSchedulerConfig,
    pub dedup: DedupConfig,
    pub gpio_pins: Vec<GpioPinConfig>,
    pub ring_buffer_seconds: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            station: StationConfig::default(),
            jurisdiction: JurisdictionConfig::default(),
            prefilter: PrefilterConfig::default(),
            scheduler: ScanSchedulerConfig::default(),
            dedup: DedupConfig::default(),
            gpio_pins: Vec::new(),
            ring_buffer_seconds: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_config_default_is_sane() {
        let config = MonitorConfig::default();
        assert!(config.scheduler.min_scan_interval_secs > 0.0);
        assert!(config.station.sample_rate_hz > 0);
    }
}
