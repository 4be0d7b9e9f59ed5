//! Assembles an outbound SAME broadcast: three header bursts, attention
//! tone, a narration slot, and three EOM bursts, written to a WAV archive
//! file with a deterministic name.

use crate::errors::AudioError;
use crate::fsk::BurstRenderer;
use crate::protocol::{PhysicalLayer, SameHeader};
use chrono::{DateTime, Utc};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

/// Attention-tone policy: which tone plays before the narration, per
/// originator. Overridable per the Open Question resolution recorded in
/// `DESIGN.md` — callers needing a different mapping can bypass
/// `tone_for_event` and call `render_two_tone`/`render_single_tone`
/// directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttentionTone {
    /// Classic EBS two-tone: 853 Hz + 960 Hz simultaneously.
    TwoTone { duration_secs: f64 },
    /// NWS single 1050 Hz tone, used for weather-originated alerts.
    SingleTone { duration_secs: f64 },
}

/// Default attention-tone policy: NWS-originated alerts (`originator ==
/// "WXR"`) get the single 1050 Hz tone broadcasters associate with
/// weather radio; everything else gets the classic two-tone EBS attention
/// signal.
pub fn tone_for_event(header: &SameHeader) -> AttentionTone {
    if header.originator == "WXR" {
        AttentionTone::SingleTone { duration_secs: 8.0 }
    } else {
        AttentionTone::TwoTone { duration_secs: 10.0 }
    }
}

fn render_tone(freqs_hz: &[f64], duration_secs: f64, sample_rate_hz: u32) -> Vec<f32> {
    let n = (duration_secs * sample_rate_hz as f64).round() as usize;
    let mut out = vec![0.0_f32; n];
    for &freq in freqs_hz {
        let phase_inc = 2.0 * std::f64::consts::PI * freq / sample_rate_hz as f64;
        let mut phase = 0.0_f64;
        for sample in out.iter_mut() {
            *sample += (phase.sin() / freqs_hz.len() as f64) as f32;
            phase += phase_inc;
        }
    }
    out
}

fn render_attention_tone(tone: AttentionTone, sample_rate_hz: u32) -> Vec<f32> {
    match tone {
        AttentionTone::TwoTone { duration_secs } => {
            render_tone(&[853.0, 960.0], duration_secs, sample_rate_hz)
        }
        AttentionTone::SingleTone { duration_secs } => {
            render_tone(&[1050.0], duration_secs, sample_rate_hz)
        }
    }
}

/// Assemble the complete broadcast waveform for `header`. `narration`, if
/// given, is mixed in verbatim after the attention tone (already at
/// `sample_rate_hz`); if absent, a minimal 2-second silent placeholder
/// stands in for the narration slot.
pub fn assemble_broadcast(header: &SameHeader, narration: Option<&[f32]>, sample_rate_hz: u32) -> Vec<f32> {
    let renderer = BurstRenderer::new(sample_rate_hz);
    let mut out = Vec::new();

    for i in 0..PhysicalLayer::BURST_COUNT {
        out.extend(renderer.render_burst(&header.raw_text));
        if i + 1 < PhysicalLayer::BURST_COUNT {
            out.extend(renderer.render_silence(PhysicalLayer::INTER_BURST_SILENCE_SECS));
        }
    }

    out.extend(renderer.render_silence(PhysicalLayer::INTER_BURST_SILENCE_SECS));
    out.extend(render_attention_tone(tone_for_event(header), sample_rate_hz));
    out.extend(renderer.render_silence(0.5));

    match narration {
        Some(samples) => out.extend_from_slice(samples),
        None => out.extend(renderer.render_silence(2.0)),
    }

    out.extend(renderer.render_silence(PhysicalLayer::INTER_BURST_SILENCE_SECS));
    for i in 0..PhysicalLayer::BURST_COUNT {
        out.extend(renderer.render_burst(PhysicalLayer::EOM_TEXT));
        if i + 1 < PhysicalLayer::BURST_COUNT {
            out.extend(renderer.render_silence(PhysicalLayer::INTER_BURST_SILENCE_SECS));
        }
    }

    out
}

/// Deterministic archive filename: `<issue-time>_<originator>_<event>_<first-location>.wav`,
/// sortable by issue time and unique enough per header that repeat
/// activations of the same event do not collide.
pub fn archive_filename(header: &SameHeader) -> String {
    let first_location = header
        .locations
        .first()
        .map(|l| l.code.as_str())
        .unwrap_or("000000");
    format!(
        "{}_{}_{}_{}.wav",
        header.issue_time, header.originator, header.event_code, first_location
    )
}

/// Write `samples` as a 16-bit PCM mono WAV file at `sample_rate_hz` into
/// `archive_dir`, returning the full path written.
pub fn write_archive(
    archive_dir: &Path,
    header: &SameHeader,
    samples: &[f32],
    sample_rate_hz: u32,
) -> Result<PathBuf, AudioError> {
    std::fs::create_dir_all(archive_dir).map_err(|e| AudioError::StorageError {
        path: archive_dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let path = archive_dir.join(archive_filename(header));
    let spec = WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(&path, spec).map_err(|e| AudioError::StorageError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let scaled = (clamped * i16::MAX as f32) as i16;
        writer.write_sample(scaled).map_err(|e| AudioError::StorageError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    writer.finalize().map_err(|e| AudioError::StorageError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(path)
}

/// Stamp the archive filename with the current wall-clock day, used by
/// callers that want a human-browsable archive layout (`archive/2026-07-26/...`)
/// rather than a flat directory.
pub fn archive_subdir_for(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header(text: &str) -> SameHeader {
        SameHeader::parse(text).unwrap()
    }

    #[test]
    fn wxr_originator_gets_single_tone() {
        let h = header("ZCZC-WXR-TOR-039137+0015-1181800-KRAJ/FM-");
        assert!(matches!(tone_for_event(&h), AttentionTone::SingleTone { .. }));
    }

    #[test]
    fn eas_originator_gets_two_tone() {
        let h = header("ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-");
        assert!(matches!(tone_for_event(&h), AttentionTone::TwoTone { .. }));
    }

    #[test]
    fn assembled_broadcast_is_nonempty_and_contains_narration() {
        let h = header("ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-");
        let narration = vec![0.25_f32; 22050 * 3];
        let out = assemble_broadcast(&h, Some(&narration), 22050);
        assert!(out.len() > narration.len());
    }

    #[test]
    fn archive_filename_is_deterministic() {
        let h = header("ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-");
        assert_eq!(archive_filename(&h), "1181800_EAS_RWT_039137.wav");
    }

    #[test]
    fn write_archive_creates_readable_wav() {
        let dir = tempdir().unwrap();
        let h = header("ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-");
        let samples = vec![0.0_f32; 1000];
        let path = write_archive(dir.path(), &h, &samples, 22050).unwrap();
        assert!(path.exists());

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
    }
}
