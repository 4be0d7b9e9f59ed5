//! Pluggable audio input for the continuous monitor.
//!
//! The monitor only ever needs a source of mono `f32` PCM chunks at a known
//! sample rate; where those samples come from (a sound card, a WAV file, a
//! network stream) is an implementation detail behind `AudioSource`.

use crate::errors::AudioError;
use hound::WavReader;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A source of continuous mono PCM audio.
pub trait AudioSource: Send {
    /// Fill `buf` with up to `buf.len()` samples, returning the number
    /// actually written. Returning `0` means end-of-stream.
    fn read_chunk(&mut self, buf: &mut [f32]) -> Result<usize, AudioError>;

    /// Sample rate of the samples this source produces.
    fn sample_rate_hz(&self) -> u32;
}

/// Reads a WAV file from start to end, then reports end-of-stream. Used by
/// the offline decoder, the self-test harness, and integration tests that
/// want the monitor loop to run against fixed input.
pub struct WavFileSource {
    reader: WavReader<BufReader<std::fs::File>>,
    sample_rate_hz: u32,
    channels: u16,
}

impl WavFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path_buf: PathBuf = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path_buf).map_err(|e| AudioError::InputMissing {
            path: format!("{}: {e}", path_buf.display()),
        })?;
        let spec = reader.spec();
        Ok(Self {
            reader,
            sample_rate_hz: spec.sample_rate,
            channels: spec.channels,
        })
    }
}

impl AudioSource for WavFileSource {
    fn read_chunk(&mut self, buf: &mut [f32]) -> Result<usize, AudioError> {
        let spec = self.reader.spec();
        let channels = self.channels.max(1) as usize;
        let mut written = 0;

        'outer: while written < buf.len() {
            let mut frame_sum = 0.0_f32;
            let mut got_any = false;
            for ch in 0..channels {
                let sample = match spec.sample_format {
                    hound::SampleFormat::Float => self.reader.samples::<f32>().next(),
                    hound::SampleFormat::Int => self
                        .reader
                        .samples::<i32>()
                        .next()
                        .map(|r| r.map(|v| v as f32 / i32::MAX as f32)),
                };
                match sample {
                    Some(Ok(v)) => {
                        frame_sum += v;
                        got_any = true;
                    }
                    Some(Err(e)) => {
                        return Err(AudioError::AudioUnavailable {
                            reason: format!("wav read error: {e}"),
                        })
                    }
                    None => {
                        if ch == 0 {
                            break 'outer; // clean end of stream
                        }
                        break 'outer; // truncated final frame, stop here
                    }
                }
            }
            if !got_any {
                break;
            }
            buf[written] = frame_sum / channels as f32;
            written += 1;
        }

        Ok(written)
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
}

/// Wraps an in-memory sample buffer as a source, for synthetic-audio tests
/// and for the self-test harness when samples already came from
/// `external_audio::load_and_resample`.
pub struct MemorySource {
    samples: Vec<f32>,
    position: usize,
    sample_rate_hz: u32,
}

impl MemorySource {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate_hz,
        }
    }
}

impl AudioSource for MemorySource {
    fn read_chunk(&mut self, buf: &mut [f32]) -> Result<usize, AudioError> {
        let remaining = self.samples.len() - self.position;
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
}
