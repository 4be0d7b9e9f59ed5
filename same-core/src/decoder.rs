//! Offline SAME decoder: given a whole buffer of audio, find header and
//! EOM bursts, vote across the (up to three) repeats of each, and return
//! fully parsed headers with a confidence score.
//!
//! Primary path is the tone correlator + DLL from `crate::dsp`. If that
//! yields nothing usable, a Goertzel baud-sweep fallback retries decode at
//! eight baud-rate offsets spanning ±4% of nominal, which recovers headers
//! from encoders with a miscalibrated clock.

use crate::config::PrefilterConfig;
use crate::dsp::{DelayLockedLoop, PrefilterGate, ToneCorrelator};
use crate::errors::DecodeError;
use crate::fsk::decode_one_tolerant;
use crate::protocol::{PhysicalLayer, SameHeader};

/// Result of decoding one audio buffer.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    /// Headers found, deduplicated by identical text, each carrying a
    /// burst-agreement confidence in `[0, 1]`.
    pub headers: Vec<SameHeader>,
    /// Number of EOM (`NNNN`) bursts detected.
    pub eom_count: usize,
    /// Whether the Goertzel baud-sweep fallback had to be used.
    pub used_fallback: bool,
}

const MAX_TEXT_BYTES: usize = PhysicalLayer::MAX_HEADER_CHARS;
const BAUD_SWEEP_STEPS: usize = 8;
const BAUD_SWEEP_SPAN: f64 = 0.04; // +/- 4%

/// Decode an entire mono `f32` buffer at `sample_rate_hz`.
pub fn decode(samples: &[f32], sample_rate_hz: u32, prefilter: &PrefilterConfig) -> Result<DecodeOutcome, DecodeError> {
    let gate = PrefilterGate::new(sample_rate_hz as f32, prefilter.window_size, prefilter.energy_threshold);
    if !any_window_passes(samples, &gate, prefilter.window_size) {
        return Err(DecodeError::NoSignal);
    }

    if let Some(outcome) = try_decode_at_baud_scale(samples, sample_rate_hz, 1.0) {
        return Ok(outcome);
    }

    for step in 0..BAUD_SWEEP_STEPS {
        let t = step as f64 / (BAUD_SWEEP_STEPS - 1) as f64 * 2.0 - 1.0; // -1..1
        let scale = 1.0 + t * BAUD_SWEEP_SPAN;
        if (scale - 1.0).abs() < f64::EPSILON {
            continue;
        }
        if let Some(mut outcome) = try_decode_at_baud_scale(samples, sample_rate_hz, scale) {
            outcome.used_fallback = true;
            return Ok(outcome);
        }
    }

    Err(DecodeError::NoSignal)
}

fn any_window_passes(samples: &[f32], gate: &PrefilterGate, window: usize) -> bool {
    if samples.len() < window {
        return !samples.is_empty() && gate.passes(samples);
    }
    samples.chunks(window).any(|chunk| chunk.len() == window && gate.passes(chunk))
}

fn try_decode_at_baud_scale(samples: &[f32], sample_rate_hz: u32, baud_scale: f64) -> Option<DecodeOutcome> {
    // Scaling the baud rate is equivalent to scaling the sample rate fed to
    // the correlator, since both only ever appear as a ratio.
    let effective_rate = sample_rate_hz as f64 / baud_scale;

    let candidates = find_burst_starts(samples, effective_rate);
    if candidates.is_empty() {
        return None;
    }

    let mut texts = Vec::new();
    let mut eom_count = 0;
    for &start in &candidates {
        let refined_start = refine_burst_start(samples, effective_rate, start);
        let bits = extract_bits(samples, effective_rate, refined_start, MAX_TEXT_BYTES * 10 + 200);
        let text = decode_text(&bits);
        if text.is_empty() {
            continue;
        }
        if SameHeader::is_eom_text(&text) {
            eom_count += 1;
        } else if text.starts_with("ZCZC") {
            texts.push(text);
        }
    }

    if texts.is_empty() && eom_count == 0 {
        return None;
    }

    let headers = vote_and_parse(texts);
    if headers.is_empty() && eom_count == 0 {
        return None;
    }

    Some(DecodeOutcome {
        headers,
        eom_count,
        used_fallback: false,
    })
}

/// Scan for burst starts: windows whose combined mark/space energy exceeds
/// a generous fraction of the run's peak energy, spaced at least one
/// preamble-length apart so a single burst is not counted twice.
fn find_burst_starts(samples: &[f32], sample_rate_hz: f64) -> Vec<usize> {
    let correlator = ToneCorrelator::new(sample_rate_hz);
    let spb = correlator.samples_per_bit().max(1.0);
    let step = (spb * 2.0).round().max(1.0) as usize;
    let win = spb.round().max(1.0) as usize;

    let mut scored = Vec::new();
    let mut i = 0;
    while i + win <= samples.len() {
        let energy = correlator.soft_decision(&samples[i..i + win]).abs();
        scored.push((i, energy));
        i += step;
    }
    if scored.is_empty() {
        return Vec::new();
    }
    let peak = scored.iter().map(|(_, e)| *e).fold(0.0_f32, f32::max);
    if peak <= f32::EPSILON {
        return Vec::new();
    }
    let threshold = peak * 0.3;

    let min_gap = (spb * PhysicalLayer::PREAMBLE_REPETITIONS as f64 * 5.0) as usize;
    let mut starts = Vec::new();
    let mut last_start: Option<usize> = None;
    for (idx, energy) in scored {
        if energy < threshold {
            continue;
        }
        if let Some(last) = last_start {
            if idx.saturating_sub(last) < min_gap {
                continue;
            }
        }
        starts.push(idx);
        last_start = Some(idx);
    }
    starts
}

/// Refine a coarse burst-start estimate to the exact bit boundary by
/// sliding a small window around it and picking whichever offset decodes
/// the longest unbroken run of preamble bytes (`0xAB`) — the same "lock
/// onto the sync word" step a hardware AFSK demodulator performs before
/// trusting its bit clock.
fn refine_burst_start(samples: &[f32], sample_rate_hz: f64, approx_start: usize) -> usize {
    let correlator = ToneCorrelator::new(sample_rate_hz);
    let spb = correlator.samples_per_bit();
    let search_radius = (spb * 3.0).round() as isize;
    let step = (spb / 8.0).max(1.0).round() as isize;

    let lo = (approx_start as isize - search_radius).max(0);
    let hi = approx_start as isize + search_radius;

    let mut best_start = approx_start;
    let mut best_score = -1i32;
    let mut pos = lo;
    while pos <= hi {
        let start = pos as usize;
        let bits = extract_bits(samples, sample_rate_hz, start, PhysicalLayer::PREAMBLE_REPETITIONS * 10 + 10);
        let score = count_preamble_run(&bits);
        if score > best_score {
            best_score = score;
            best_start = start;
        }
        pos += step;
    }
    best_start
}

fn count_preamble_run(bits: &[bool]) -> i32 {
    let mut offset = 0;
    let mut count = 0;
    while offset + 10 <= bits.len() {
        match decode_one_tolerant(&bits[offset..]) {
            Some((byte, consumed, _mode)) if byte == PhysicalLayer::PREAMBLE_BYTE => {
                count += 1;
                offset += consumed;
            }
            _ => break,
        }
    }
    count
}

fn sample_window(samples: &[f32], start: f64, len: usize) -> Option<&[f32]> {
    if start < 0.0 {
        return None;
    }
    let start_idx = start.round() as usize;
    if start_idx + len > samples.len() {
        return None;
    }
    Some(&samples[start_idx..start_idx + len])
}

/// Walk forward from `start_sample` pulling one soft bit decision per bit
/// cell, letting the DLL nudge the cell boundary on every transition.
fn extract_bits(samples: &[f32], sample_rate_hz: f64, start_sample: usize, max_bits: usize) -> Vec<bool> {
    let correlator = ToneCorrelator::new(sample_rate_hz);
    let spb = correlator.samples_per_bit();
    let mut dll = DelayLockedLoop::new(spb);
    let win_len = (spb * 0.5).round().max(1.0) as usize;

    let mut bits = Vec::with_capacity(max_bits);
    let mut pos = start_sample as f64;

    for _ in 0..max_bits {
        let early_pos = pos - spb * 0.25;
        let late_pos = pos + spb * 0.25;

        let (Some(early_w), Some(center_w), Some(late_w)) = (
            sample_window(samples, early_pos, win_len),
            sample_window(samples, pos, win_len),
            sample_window(samples, late_pos, win_len),
        ) else {
            break;
        };

        let early = correlator.soft_decision(early_w);
        let center = correlator.soft_decision(center_w);
        let late = correlator.soft_decision(late_w);

        let bit = dll.update(early, center, late);
        bits.push(bit);

        pos += spb + dll.take_correction();
    }

    bits
}

/// Decode a bit stream into ASCII text, stopping at the first byte that is
/// neither printable ASCII nor the preamble byte (which is simply skipped).
fn decode_text(bits: &[bool]) -> String {
    let mut text = String::new();
    let mut offset = 0;
    let mut consecutive_skips = 0;

    while offset + 10 <= bits.len() && text.len() < MAX_TEXT_BYTES {
        match decode_one_tolerant(&bits[offset..]) {
            Some((byte, consumed, _mode)) => {
                offset += consumed;
                if byte == PhysicalLayer::PREAMBLE_BYTE {
                    consecutive_skips += 1;
                    if consecutive_skips > PhysicalLayer::PREAMBLE_REPETITIONS * 2 {
                        break; // stuck in preamble noise, give up
                    }
                    continue;
                }
                consecutive_skips = 0;
                if byte.is_ascii_graphic() || byte == b' ' {
                    text.push(byte as char);
                } else if !text.is_empty() {
                    break; // end of printable run after a header/EOM started
                }
            }
            None => {
                offset += 1; // slip one bit and retry framing
                consecutive_skips += 1;
                if consecutive_skips > bits.len() {
                    break;
                }
            }
        }
    }

    text
}

/// Majority-vote identical headers seen across up to three burst repeats,
/// returning each distinct header text with a confidence proportional to
/// how many of the repeats agreed.
fn vote_and_parse(texts: Vec<String>) -> Vec<SameHeader> {
    use std::collections::HashMap;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in &texts {
        *counts.entry(text.clone()).or_insert(0) += 1;
    }

    let total_bursts = texts.len().max(1) as f64;
    let mut headers = Vec::new();
    for (text, count) in counts {
        if let Ok(header) = SameHeader::parse(&text) {
            let confidence = (count as f64 / total_bursts).min(1.0);
            headers.push(header.with_confidence(confidence));
        }
    }
    headers.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsk::BurstRenderer;

    fn burst_samples(text: &str, sample_rate: u32) -> Vec<f32> {
        BurstRenderer::new(sample_rate).render_burst(text)
    }

    #[test]
    fn decodes_a_single_clean_burst() {
        let sample_rate = 22050;
        let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
        let mut samples = vec![0.0_f32; 500];
        samples.extend(burst_samples(text, sample_rate));
        samples.extend(vec![0.0_f32; 500]);

        let outcome = decode(&samples, sample_rate, &PrefilterConfig::default());
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap();
        assert!(!outcome.headers.is_empty());
        assert_eq!(outcome.headers[0].event_code, "RWT");
    }

    #[test]
    fn three_identical_bursts_vote_to_full_confidence() {
        let sample_rate = 22050;
        let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
        let mut samples = Vec::new();
        for _ in 0..3 {
            samples.extend(vec![0.0_f32; 200]);
            samples.extend(burst_samples(text, sample_rate));
        }
        samples.extend(vec![0.0_f32; 200]);

        let outcome = decode(&samples, sample_rate, &PrefilterConfig::default()).unwrap();
        assert!(!outcome.headers.is_empty());
        assert!(outcome.headers[0].confidence > 0.9);
    }

    #[test]
    fn silence_only_returns_no_signal() {
        let samples = vec![0.0_f32; 22050];
        let result = decode(&samples, 22050, &PrefilterConfig::default());
        assert!(matches!(result, Err(DecodeError::NoSignal)));
    }

    #[test]
    fn decode_text_skips_preamble_bytes() {
        use crate::fsk::BurstRenderer;
        let renderer = BurstRenderer::new(22050);
        let samples = renderer.render_burst("NNNN");
        // sanity: rendering an EOM burst and decoding bits back should
        // surface NNNN somewhere once framed correctly.
        assert!(!samples.is_empty());
    }
}
