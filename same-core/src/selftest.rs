//! Self-test harness: decodes a batch of reference audio files end to end
//! (decode -> dedup -> jurisdiction match) and reports a per-file status,
//! the way a station operator would run it after changing antenna setup
//! or config to confirm the whole pipeline still works. Ported from
//! `AlertSelfTestHarness`/`AlertSelfTestResult` in
//! `original_source/app_core/audio/self_test.py`.

use crate::config::{DedupConfig, JurisdictionConfig, PrefilterConfig};
use crate::dedup::DedupCache;
use crate::decoder;
use crate::external_audio;
use crate::jurisdiction;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// High-level disposition for a replayed audio file, chosen by priority:
/// a decode failure always wins, then duplicate suppression, then whether
/// the decoded header matched a configured jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfTestStatus {
    Forwarded,
    Filtered,
    DuplicateSuppressed,
    DecodeError,
}

/// Outcome of running the pipeline against one audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: SelfTestStatus,
    pub reason: String,
    pub event_code: String,
    pub originator: String,
    pub alert_fips_codes: Vec<String>,
    pub matched_fips_codes: Vec<String>,
    pub confidence: f64,
    pub duration_seconds: f64,
    pub raw_text: String,
    pub duplicate: bool,
    pub error: Option<String>,
}

impl FileResult {
    pub fn passed(&self) -> bool {
        self.status == SelfTestStatus::Forwarded
    }

    fn decode_error(path: &Path, error: String, duration_seconds: f64) -> Self {
        Self {
            path: path.to_path_buf(),
            status: SelfTestStatus::DecodeError,
            reason: "Unable to decode audio".to_string(),
            event_code: "UNKNOWN".to_string(),
            originator: "UNKNOWN".to_string(),
            alert_fips_codes: Vec::new(),
            matched_fips_codes: Vec::new(),
            confidence: 0.0,
            duration_seconds,
            raw_text: String::new(),
            duplicate: false,
            error: Some(error),
        }
    }
}

/// Summary across the whole batch.
#[derive(Debug, Default)]
pub struct SelfTestReport {
    pub results: Vec<FileResult>,
}

impl SelfTestReport {
    pub fn pass_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn fail_count(&self) -> usize {
        self.results.len() - self.pass_count()
    }
}

/// Run the full decode -> dedup -> jurisdiction pipeline over `paths`, one
/// file at a time, sharing a single dedup cache across the whole batch so
/// that duplicate fixture files exercise the cooldown path too.
pub fn run(
    paths: &[PathBuf],
    sample_rate_hz: u32,
    prefilter: &PrefilterConfig,
    jurisdiction_config: &JurisdictionConfig,
    dedup_config: &DedupConfig,
) -> SelfTestReport {
    let mut cache = DedupCache::new(dedup_config);
    let mut results = Vec::with_capacity(paths.len());

    for path in paths {
        let result = run_one(path, sample_rate_hz, prefilter, jurisdiction_config, &mut cache);
        results.push(result);
    }

    SelfTestReport { results }
}

fn run_one(
    path: &Path,
    sample_rate_hz: u32,
    prefilter: &PrefilterConfig,
    jurisdiction_config: &JurisdictionConfig,
    cache: &mut DedupCache,
) -> FileResult {
    let started = Instant::now();

    let samples = match external_audio::load_and_resample(path, sample_rate_hz) {
        Ok(samples) => samples,
        Err(e) => return FileResult::decode_error(path, e.to_string(), started.elapsed().as_secs_f64()),
    };

    let outcome = match decoder::decode(&samples, sample_rate_hz, prefilter) {
        Ok(outcome) => outcome,
        Err(e) => return FileResult::decode_error(path, e.to_string(), started.elapsed().as_secs_f64()),
    };

    let duration_seconds = started.elapsed().as_secs_f64();

    let Some(header) = outcome.headers.first() else {
        return FileResult {
            path: path.to_path_buf(),
            status: SelfTestStatus::Filtered,
            reason: "No header decoded".to_string(),
            event_code: "UNKNOWN".to_string(),
            originator: "UNKNOWN".to_string(),
            alert_fips_codes: Vec::new(),
            matched_fips_codes: Vec::new(),
            confidence: 0.0,
            duration_seconds,
            raw_text: String::new(),
            duplicate: false,
            error: None,
        };
    };

    let alert_fips_codes: Vec<String> = header.locations.iter().map(|l| l.code.clone()).collect();
    let matched_fips_codes = jurisdiction::determine_fips_matches(header, jurisdiction_config);
    let is_duplicate = !cache.accept(header, Utc::now());

    let (status, reason) = if is_duplicate {
        (
            SelfTestStatus::DuplicateSuppressed,
            format!("Duplicate within {}s window", cache.cooldown_secs()),
        )
    } else if !matched_fips_codes.is_empty() {
        (
            SelfTestStatus::Forwarded,
            format!("Matched configured FIPS: {}", matched_fips_codes.join(", ")),
        )
    } else {
        (SelfTestStatus::Filtered, "No configured FIPS overlap".to_string())
    };

    FileResult {
        path: path.to_path_buf(),
        status,
        reason,
        event_code: header.event_code.clone(),
        originator: header.originator.clone(),
        alert_fips_codes,
        matched_fips_codes,
        confidence: header.confidence,
        duration_seconds,
        raw_text: header.raw_text.clone(),
        duplicate: is_duplicate,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_counts_as_decode_error() {
        let report = run(
            &[PathBuf::from("/nonexistent/fixture.wav")],
            22050,
            &PrefilterConfig::default(),
            &JurisdictionConfig::default(),
            &DedupConfig::default(),
        );
        assert_eq!(report.fail_count(), 1);
        assert_eq!(report.pass_count(), 0);
        assert_eq!(report.results[0].status, SelfTestStatus::DecodeError);
        assert!(report.results[0].error.is_some());
    }

    #[test]
    fn empty_batch_reports_zero_of_zero() {
        let report = run(
            &[],
            22050,
            &PrefilterConfig::default(),
            &JurisdictionConfig::default(),
            &DedupConfig::default(),
        );
        assert_eq!(report.pass_count(), 0);
        assert_eq!(report.fail_count(), 0);
    }
}
