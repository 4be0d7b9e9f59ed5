//! AFSK bit framing and tone rendering for SAME bursts.
//!
//! Encoding is always 8N1 (one start bit, eight data bits LSB-first, one
//! stop bit, no parity) as produced by every modern SAME encoder. Decoding
//! tolerates both 8N1 and the legacy 7E1 framing (seven data bits plus even
//! parity) still emitted by some older hardware encoders in the field, per
//! the framing Open Question resolved in `SPEC_FULL.md`.

use crate::protocol::{FramingMode, PhysicalLayer};

/// Render one burst (preamble + ASCII text) as mark/space AFSK samples at
/// `sample_rate_hz`, using fractional-sample accumulation so the 520.8333
/// baud rate never drifts across a long burst.
pub struct BurstRenderer {
    sample_rate_hz: u32,
}

impl BurstRenderer {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self { sample_rate_hz }
    }

    /// Render the full burst: 16 preamble bytes of 0xAB, then the ASCII
    /// text, each byte framed 8N1.
    pub fn render_burst(&self, text: &str) -> Vec<f32> {
        let mut bits = Vec::new();
        for _ in 0..PhysicalLayer::PREAMBLE_REPETITIONS {
            push_framed_byte(&mut bits, PhysicalLayer::PREAMBLE_BYTE, FramingMode::EightN1);
        }
        for byte in text.bytes() {
            push_framed_byte(&mut bits, byte, FramingMode::EightN1);
        }
        self.render_bits(&bits)
    }

    /// Render a raw bit sequence (1 = mark, 0 = space) to audio samples.
    pub fn render_bits(&self, bits: &[bool]) -> Vec<f32> {
        let samples_per_bit = self.sample_rate_hz as f64 / PhysicalLayer::BAUD;
        let mut out = Vec::with_capacity((bits.len() as f64 * samples_per_bit).ceil() as usize);

        let mut carry = 0.0_f64;
        let mut phase = 0.0_f64;

        for &bit in bits {
            let freq = if bit {
                PhysicalLayer::MARK_FREQ_HZ
            } else {
                PhysicalLayer::SPACE_FREQ_HZ
            };

            // Fractional-sample accumulation: each bit nominally spans
            // `samples_per_bit` samples, but that is not an integer, so we
            // carry the remainder into the next bit rather than rounding
            // every bit independently (which would drift the baud clock).
            let exact = samples_per_bit + carry;
            let n = exact.round() as usize;
            carry = exact - n as f64;

            let phase_inc = 2.0 * std::f64::consts::PI * freq / self.sample_rate_hz as f64;
            for _ in 0..n {
                out.push(phase.sin() as f32);
                phase += phase_inc;
                if phase > 2.0 * std::f64::consts::PI {
                    phase -= 2.0 * std::f64::consts::PI;
                }
            }
        }

        out
    }

    /// Render `duration_secs` of digital silence (used between bursts).
    pub fn render_silence(&self, duration_secs: f64) -> Vec<f32> {
        let n = (duration_secs * self.sample_rate_hz as f64).round() as usize;
        vec![0.0_f32; n]
    }
}

/// Push one byte onto `bits` in the given framing mode: start bit (0),
/// data bits LSB-first, optional even parity, stop bit (1).
fn push_framed_byte(bits: &mut Vec<bool>, byte: u8, mode: FramingMode) {
    bits.push(false); // start bit

    match mode {
        FramingMode::EightN1 => {
            for i in 0..8 {
                bits.push((byte >> i) & 1 == 1);
            }
        }
        FramingMode::SevenE1 => {
            let mut parity = 0u8;
            for i in 0..7 {
                let b = (byte >> i) & 1;
                bits.push(b == 1);
                parity ^= b;
            }
            bits.push(parity == 1); // even parity bit
        }
    }

    bits.push(true); // stop bit
}

/// Decode a stream of sampled bit-cell values (one bool per bit, already
/// timing-recovered) back into bytes, tolerating both framing modes. Bytes
/// that fail to frame correctly in either mode are dropped and counted as
/// a frame error by the caller.
pub struct FrameDecoder {
    mode: FramingMode,
}

impl FrameDecoder {
    pub fn new(mode: FramingMode) -> Self {
        Self { mode }
    }

    /// Attempt to decode one framed character starting at `bits[0]`
    /// (expected start bit). Returns `Some((byte, bits_consumed))` on a
    /// structurally valid frame (correct start/stop/parity), `None`
    /// otherwise.
    pub fn decode_one(&self, bits: &[bool]) -> Option<(u8, usize)> {
        match self.mode {
            FramingMode::EightN1 => {
                if bits.len() < 10 {
                    return None;
                }
                if bits[0] {
                    return None; // bad start bit
                }
                let mut byte = 0u8;
                for i in 0..8 {
                    if bits[1 + i] {
                        byte |= 1 << i;
                    }
                }
                if !bits[9] {
                    return None; // bad stop bit
                }
                Some((byte, 10))
            }
            FramingMode::SevenE1 => {
                if bits.len() < 10 {
                    return None;
                }
                if bits[0] {
                    return None;
                }
                let mut byte = 0u8;
                let mut parity = 0u8;
                for i in 0..7 {
                    let b = bits[1 + i];
                    if b {
                        byte |= 1 << i;
                        parity ^= 1;
                    }
                }
                let parity_bit = bits[8];
                if (parity_bit as u8) != parity {
                    return None; // parity mismatch
                }
                if !bits[9] {
                    return None; // bad stop bit
                }
                Some((byte, 10))
            }
        }
    }

    /// Number of bits consumed by one framed character in this mode.
    pub fn frame_width(&self) -> usize {
        10
    }
}

/// Try both framing modes on the same bit stream and return whichever
/// decodes cleanly (8N1 preferred, since it is the modern default).
pub fn decode_one_tolerant(bits: &[bool]) -> Option<(u8, usize, FramingMode)> {
    let eight = FrameDecoder::new(FramingMode::EightN1);
    if let Some((byte, consumed)) = eight.decode_one(bits) {
        return Some((byte, consumed, FramingMode::EightN1));
    }
    let seven = FrameDecoder::new(FramingMode::SevenE1);
    if let Some((byte, consumed)) = seven.decode_one(bits) {
        return Some((byte, consumed, FramingMode::SevenE1));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_burst_produces_nonempty_samples() {
        let renderer = BurstRenderer::new(22050);
        let samples = renderer.render_burst("ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-");
        assert!(!samples.is_empty());
        // roughly: (16 preamble + 42 text) bytes * 10 bits/byte / baud * sample_rate
        let expected_bits = (PhysicalLayer::PREAMBLE_REPETITIONS + 42) * 10;
        let expected_samples =
            (expected_bits as f64 / PhysicalLayer::BAUD * 22050.0).round() as usize;
        let diff = (samples.len() as i64 - expected_samples as i64).abs();
        assert!(diff < 10, "sample count {} vs expected {}", samples.len(), expected_samples);
    }

    #[test]
    fn render_silence_matches_duration() {
        let renderer = BurstRenderer::new(8000);
        let samples = renderer.render_silence(1.0);
        assert_eq!(samples.len(), 8000);
    }

    #[test]
    fn frame_round_trip_8n1() {
        let mut bits = Vec::new();
        push_framed_byte(&mut bits, 0xAB, FramingMode::EightN1);
        let decoder = FrameDecoder::new(FramingMode::EightN1);
        let (byte, consumed) = decoder.decode_one(&bits).expect("frame should decode");
        assert_eq!(byte, 0xAB);
        assert_eq!(consumed, 10);
    }

    #[test]
    fn frame_round_trip_7e1() {
        let mut bits = Vec::new();
        push_framed_byte(&mut bits, b'Z', FramingMode::SevenE1);
        let decoder = FrameDecoder::new(FramingMode::SevenE1);
        let (byte, _) = decoder.decode_one(&bits).expect("frame should decode");
        assert_eq!(byte, b'Z');
    }

    #[test]
    fn tolerant_decode_accepts_either_mode() {
        let mut bits_8n1 = Vec::new();
        push_framed_byte(&mut bits_8n1, b'Q', FramingMode::EightN1);
        let (byte, _, mode) = decode_one_tolerant(&bits_8n1).expect("should decode");
        assert_eq!(byte, b'Q');
        assert_eq!(mode, FramingMode::EightN1);
    }

    #[test]
    fn bad_start_bit_rejected() {
        let bits = vec![true; 10];
        let decoder = FrameDecoder::new(FramingMode::EightN1);
        assert!(decoder.decode_one(&bits).is_none());
    }
}
