//! Loading WAV/MP3 files from disk and resampling them to the decoder's
//! working sample rate.
//!
//! Adapted from the decode-side half of the teacher's external audio
//! pipeline: `symphonia` handles container/codec decode, `rubato` handles
//! sample-rate conversion. The encode-specific pieces (QPSK carrier mixing)
//! did not survive the transform — this module now only loads mono PCM for
//! the SAME decoder and the self-test harness.

use crate::errors::AudioError;
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded, mono, `f32` PCM at its original sample rate.
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

/// Load an audio file (WAV or MP3) from disk, downmixing to mono.
pub fn load_audio_file(path: &Path) -> Result<DecodedAudio, AudioError> {
    let file = File::open(path).map_err(|_| AudioError::InputMissing {
        path: path.display().to_string(),
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::AudioUnavailable {
            reason: format!("unrecognized container: {e}"),
        })?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::AudioUnavailable {
            reason: "no decodable audio track".to_string(),
        })?
        .clone();

    let sample_rate_hz = track.codec_params.sample_rate.ok_or_else(|| AudioError::AudioUnavailable {
        reason: "track has no sample rate".to_string(),
    })?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::AudioUnavailable {
            reason: format!("unsupported codec: {e}"),
        })?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(_)) => break, // end of stream
            Err(e) => {
                return Err(AudioError::AudioUnavailable {
                    reason: format!("demux error: {e}"),
                })
            }
        };

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                for frame in buf.samples().chunks(channels) {
                    let sum: f32 = frame.iter().sum();
                    mono.push(sum / channels as f32);
                }
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => {
                return Err(AudioError::AudioUnavailable {
                    reason: format!("decode error: {e}"),
                })
            }
        }
    }

    Ok(DecodedAudio {
        samples: mono,
        sample_rate_hz,
    })
}

/// Resample `input` from `from_hz` to `to_hz` using a windowed-sinc filter.
/// Returns `input` unchanged if the rates already match.
pub fn resample(input: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>, AudioError> {
    if from_hz == to_hz || input.is_empty() {
        return Ok(input.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_hz as f64 / from_hz as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input.len(), 1)
        .map_err(|e| AudioError::AudioUnavailable {
            reason: format!("failed to construct resampler: {e}"),
        })?;

    let out = resampler
        .process(&[input.to_vec()], None)
        .map_err(|e| AudioError::AudioUnavailable {
            reason: format!("resample failed: {e}"),
        })?;

    Ok(out.into_iter().next().unwrap_or_default())
}

/// Load a file and resample it to `target_hz` in one step, the form most
/// callers (decoder, self-test harness) actually want.
pub fn load_and_resample(path: &Path, target_hz: u32) -> Result<Vec<f32>, AudioError> {
    let decoded = load_audio_file(path)?;
    resample(&decoded.samples, decoded.sample_rate_hz, target_hz)
}
