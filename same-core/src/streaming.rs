//! Stateful streaming decoder: feeds arbitrarily-sized audio chunks
//! through the same correlator/DLL core the offline decoder uses, without
//! requiring the whole recording up front. Used by the continuous monitor
//! (`crate::monitor`) to decode directly off the ring buffer.

use crate::config::PrefilterConfig;
use crate::decoder::{self, DecodeOutcome};
use crate::errors::DecodeError;
use crate::protocol::SameHeader;
use std::collections::HashSet;

/// Running counters exposed to callers for observability (surfaced by the
/// monitor's status report and the CLI's `decode --stream` diagnostics).
#[derive(Debug, Clone, Default)]
pub struct StreamingStats {
    pub samples_processed: u64,
    pub decode_attempts: u64,
    pub headers_emitted: u64,
    pub eoms_emitted: u64,
}

/// A sliding-window decoder over a continuous sample stream.
pub struct StreamingDecoder {
    sample_rate_hz: u32,
    prefilter: PrefilterConfig,
    buffer: Vec<f32>,
    max_buffer_samples: usize,
    recently_emitted: HashSet<String>,
    stats: StreamingStats,
}

impl StreamingDecoder {
    /// `window_seconds` bounds how much audio history is retained — long
    /// enough to span a full 3-burst header transmission (roughly 9-12s
    /// for a typical SAME message) plus slack.
    pub fn new(sample_rate_hz: u32, prefilter: PrefilterConfig, window_seconds: f64) -> Self {
        Self {
            sample_rate_hz,
            prefilter,
            buffer: Vec::new(),
            max_buffer_samples: (sample_rate_hz as f64 * window_seconds).round() as usize,
            recently_emitted: HashSet::new(),
            stats: StreamingStats::default(),
        }
    }

    /// Feed the next chunk of mono samples. Newly-seen headers (not already
    /// reported from the current sliding window) are passed to `on_header`.
    /// Returns the number of headers emitted this call.
    pub fn process_samples(
        &mut self,
        chunk: &[f32],
        mut on_header: impl FnMut(&SameHeader),
    ) -> Result<usize, DecodeError> {
        self.stats.samples_processed += chunk.len() as u64;
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > self.max_buffer_samples {
            let excess = self.buffer.len() - self.max_buffer_samples;
            self.buffer.drain(0..excess);
        }

        self.stats.decode_attempts += 1;
        let outcome: DecodeOutcome = match decoder::decode(&self.buffer, self.sample_rate_hz, &self.prefilter) {
            Ok(outcome) => outcome,
            Err(DecodeError::NoSignal) => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut emitted = 0;
        for header in &outcome.headers {
            let key = header.normalized_text();
            if self.recently_emitted.insert(key) {
                on_header(header);
                emitted += 1;
                self.stats.headers_emitted += 1;
            }
        }
        self.stats.eoms_emitted += outcome.eom_count as u64;

        // Bound the emitted-header memory: once the sliding window has
        // fully rolled past a burst, forget it so an identical later
        // activation is not silently treated as already-seen.
        if self.recently_emitted.len() > 64 {
            self.recently_emitted.clear();
        }

        Ok(emitted)
    }

    /// Discard all buffered audio and emitted-header memory, e.g. after a
    /// watchdog recovery restarts the audio path.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.recently_emitted.clear();
    }

    pub fn stats(&self) -> &StreamingStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsk::BurstRenderer;

    #[test]
    fn emits_header_once_across_chunks() {
        let sample_rate = 22050;
        let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
        let mut full = vec![0.0_f32; 400];
        full.extend(BurstRenderer::new(sample_rate).render_burst(text));
        full.extend(vec![0.0_f32; 400]);

        let mut decoder = StreamingDecoder::new(sample_rate, PrefilterConfig::default(), 30.0);
        let mut seen = Vec::new();

        for chunk in full.chunks(512) {
            decoder
                .process_samples(chunk, |h| seen.push(h.raw_text.clone()))
                .unwrap();
        }
        // Feed a bit more silence so the decoder gets one more pass over
        // the full buffered burst.
        for _ in 0..10 {
            decoder
                .process_samples(&[0.0_f32; 512], |h| seen.push(h.raw_text.clone()))
                .unwrap();
        }

        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn reset_clears_buffer_and_emitted_memory() {
        let mut decoder = StreamingDecoder::new(22050, PrefilterConfig::default(), 5.0);
        decoder.process_samples(&[0.0_f32; 1024], |_| {}).unwrap();
        decoder.reset();
        assert_eq!(decoder.stats().samples_processed, 1024);
        assert!(decoder.buffer.is_empty());
    }

    #[test]
    fn silence_never_emits() {
        let mut decoder = StreamingDecoder::new(22050, PrefilterConfig::default(), 5.0);
        let mut count = 0;
        for _ in 0..5 {
            count += decoder.process_samples(&[0.0_f32; 4096], |_| {}).unwrap();
        }
        assert_eq!(count, 0);
    }
}
