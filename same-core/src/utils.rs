//! Small numeric helpers shared across the DSP, decoder and broadcaster
//! modules.

/// Root-mean-square level of a sample buffer, used for basic audio-health
/// diagnostics (e.g. detecting a dead input line before even trying to
/// decode it).
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    ((sum_sq / samples.len() as f64).sqrt()) as f32
}

/// Peak absolute sample value, used to detect clipping in recorded audio.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()))
}

/// Linearly mix two buffers of equal length, clamping to `[-1, 1]`.
pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x + y).clamp(-1.0, 1.0))
        .collect()
}

/// Format a duration in seconds as `MM:SS`, used by CLI status output.
pub fn format_duration_secs(total_secs: f64) -> String {
    let total = total_secs.max(0.0).round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
