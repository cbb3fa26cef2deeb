//! Best-effort audio analysis.
//!
//! This module handles:
//! 1. Extracting the audio track to a temporary mono 22.05 kHz stream
//! 2. Computing tempo, beats, spectral centroid, zero-crossing rate, RMS
//! 3. Removing the temporary stream on completion
//!
//! Every failure here degrades the audio profile instead of failing the
//! extraction: a silent or audio-less clip still gets a full critique.

use std::path::Path;
use std::process::{Command, Stdio};

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use cine_models::features::AudioFeatures;

/// Sample rate the audio track is resampled to.
const SAMPLE_RATE: usize = 22_050;

/// FFT frame size for spectral features.
const FRAME_SIZE: usize = 2048;

/// Hop between analysis frames.
const HOP_SIZE: usize = 512;

/// Tempo search range in BPM.
const TEMPO_MIN_BPM: f64 = 60.0;
const TEMPO_MAX_BPM: f64 = 180.0;

/// Errors from audio analysis.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("FFmpeg audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Failed to read audio stream: {0}")]
    StreamReadFailed(#[from] std::io::Error),

    #[error("No audio data found in file")]
    NoAudioData,

    #[error("Audio too short for analysis")]
    AudioTooShort,
}

/// Result type for audio analysis.
pub type AudioResult<T> = Result<T, AudioError>;

/// Analyze the audio track of a media file.
///
/// Extracts to a temp stream, computes all metrics, and cleans up. Runs
/// synchronously inside the extraction worker pool.
pub fn analyze_audio(input: &Path) -> AudioResult<AudioFeatures> {
    let temp_audio = NamedTempFile::new()?;
    extract_audio_stream(input, temp_audio.path())?;

    let samples = load_audio_samples(temp_audio.path())?;
    if samples.is_empty() {
        return Err(AudioError::NoAudioData);
    }
    if samples.len() < FRAME_SIZE * 4 {
        return Err(AudioError::AudioTooShort);
    }

    let duration = samples.len() as f64 / SAMPLE_RATE as f64;
    let envelope = rms_envelope(&samples);
    let hops_per_sec = SAMPLE_RATE as f64 / HOP_SIZE as f64;
    let (tempo, beat_count) = estimate_tempo(&envelope, hops_per_sec);

    let avg_energy = envelope.iter().sum::<f64>() / envelope.len().max(1) as f64;

    let features = AudioFeatures {
        tempo,
        beat_count,
        avg_spectral_centroid: avg_spectral_centroid(&samples),
        zero_crossing_rate: zero_crossing_rate(&samples),
        avg_energy,
        duration,
    };

    debug!(
        tempo = format!("{:.1}", features.tempo),
        beats = features.beat_count,
        duration = format!("{:.2}s", features.duration),
        "Audio analysis complete"
    );

    Ok(features)
}

/// Extract the audio track to mono 22.05 kHz raw f32le PCM.
fn extract_audio_stream(input: &Path, output: &Path) -> AudioResult<()> {
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(input)
        .args([
            "-vn",
            "-ac",
            "1",
            "-ar",
            &SAMPLE_RATE.to_string(),
            "-f",
            "f32le",
            "-y",
        ])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| AudioError::ExtractionFailed(e.to_string()))?;

    if !status.success() {
        return Err(AudioError::ExtractionFailed(format!(
            "ffmpeg exited with code {:?}",
            status.code()
        )));
    }

    let metadata = std::fs::metadata(output)?;
    if metadata.len() == 0 {
        return Err(AudioError::NoAudioData);
    }

    Ok(())
}

/// Load raw f32le samples from a file.
fn load_audio_samples(path: &Path) -> AudioResult<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    let samples = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(samples)
}

/// Per-hop RMS energy envelope.
fn rms_envelope(samples: &[f32]) -> Vec<f64> {
    samples
        .windows(FRAME_SIZE)
        .step_by(HOP_SIZE)
        .map(|frame| {
            let sum_sq: f64 = frame.iter().map(|&s| (s as f64).powi(2)).sum();
            (sum_sq / frame.len() as f64).sqrt()
        })
        .collect()
}

/// Fraction of adjacent sample pairs that cross zero.
fn zero_crossing_rate(samples: &[f32]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f64 / samples.len() as f64
}

/// Average spectral centroid over Hann-windowed FFT frames.
fn avg_spectral_centroid(samples: &[f32]) -> f64 {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);

    let hann: Vec<f64> = (0..FRAME_SIZE)
        .map(|n| {
            let x = std::f64::consts::PI * n as f64 / (FRAME_SIZE - 1) as f64;
            x.sin().powi(2)
        })
        .collect();

    let bin_hz = SAMPLE_RATE as f64 / FRAME_SIZE as f64;
    let mut centroids = Vec::new();
    let mut buffer = vec![Complex::new(0.0, 0.0); FRAME_SIZE];

    for frame in samples.windows(FRAME_SIZE).step_by(HOP_SIZE) {
        for (i, &s) in frame.iter().enumerate() {
            buffer[i] = Complex::new(s as f64 * hann[i], 0.0);
        }
        fft.process(&mut buffer);

        let mut weighted = 0.0;
        let mut total = 0.0;
        for (k, bin) in buffer.iter().take(FRAME_SIZE / 2).enumerate() {
            let magnitude = bin.norm();
            weighted += k as f64 * bin_hz * magnitude;
            total += magnitude;
        }

        if total > 1e-9 {
            centroids.push(weighted / total);
        }
    }

    if centroids.is_empty() {
        return 0.0;
    }
    centroids.iter().sum::<f64>() / centroids.len() as f64
}

/// Estimate tempo by autocorrelating the onset envelope.
///
/// The onset envelope is the positive energy flux between hops; the lag
/// with the strongest self-similarity inside the 60-180 BPM window sets
/// the tempo. Beats are counted as onset peaks above an adaptive
/// threshold. Returns (0.0, 0) for signals with no rhythmic energy.
fn estimate_tempo(envelope: &[f64], hops_per_sec: f64) -> (f64, u64) {
    if envelope.len() < 4 {
        return (0.0, 0);
    }

    let onset: Vec<f64> = envelope
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect();

    let lag_min = (hops_per_sec * 60.0 / TEMPO_MAX_BPM).round().max(1.0) as usize;
    let lag_max = (hops_per_sec * 60.0 / TEMPO_MIN_BPM).round() as usize;
    if onset.len() <= lag_max * 2 {
        return (0.0, count_beats(&onset));
    }

    let mut best_lag = 0usize;
    let mut best_score = 0.0f64;
    for lag in lag_min..=lag_max {
        let n = onset.len() - lag;
        let score: f64 = (0..n).map(|i| onset[i] * onset[i + lag]).sum::<f64>() / n as f64;
        // Strict comparison keeps the smallest lag on harmonic ties,
        // biasing toward the faster tempo interpretation.
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_score <= 0.0 {
        return (0.0, count_beats(&onset));
    }

    let tempo = 60.0 * hops_per_sec / best_lag as f64;
    (tempo, count_beats(&onset))
}

/// Count onset peaks above mean + one standard deviation.
fn count_beats(onset: &[f64]) -> u64 {
    if onset.len() < 3 {
        return 0;
    }

    let n = onset.len() as f64;
    let mean = onset.iter().sum::<f64>() / n;
    let var = onset.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / n;
    let threshold = mean + var.sqrt();

    let mut beats = 0u64;
    for i in 1..onset.len() - 1 {
        if onset[i] > threshold && onset[i] > onset[i - 1] && onset[i] >= onset[i + 1] {
            beats += 1;
        }
    }
    beats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, seconds: f64, amplitude: f32) -> Vec<f32> {
        let count = (seconds * SAMPLE_RATE as f64) as usize;
        (0..count)
            .map(|n| {
                let t = n as f64 / SAMPLE_RATE as f64;
                amplitude * (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect()
    }

    /// Silence with short full-scale bursts at a fixed beat period.
    fn click_track(bpm: f64, seconds: f64) -> Vec<f32> {
        let count = (seconds * SAMPLE_RATE as f64) as usize;
        let period = (60.0 / bpm * SAMPLE_RATE as f64) as usize;
        let mut samples = vec![0.0f32; count];
        let mut pos = 0;
        while pos < count {
            for (i, sample) in samples[pos..(pos + 512).min(count)].iter_mut().enumerate() {
                *sample = if i % 2 == 0 { 1.0 } else { -1.0 };
            }
            pos += period;
        }
        samples
    }

    #[test]
    fn test_zero_crossing_rate_of_sine() {
        // A 440 Hz sine crosses zero twice per cycle.
        let samples = sine(440.0, 1.0, 0.8);
        let expected = 2.0 * 440.0 / SAMPLE_RATE as f64;
        let zcr = zero_crossing_rate(&samples);
        assert!((zcr - expected).abs() < 0.005, "zcr = {}", zcr);
    }

    #[test]
    fn test_spectral_centroid_tracks_tone_frequency() {
        let low = avg_spectral_centroid(&sine(220.0, 1.0, 0.8));
        let high = avg_spectral_centroid(&sine(3000.0, 1.0, 0.8));
        assert!((low - 220.0).abs() < 80.0, "low centroid = {}", low);
        assert!((high - 3000.0).abs() < 150.0, "high centroid = {}", high);
        assert!(high > low);
    }

    #[test]
    fn test_rms_envelope_of_constant_sine() {
        // RMS of a sine with amplitude A is A / sqrt(2).
        let samples = sine(440.0, 1.0, 0.5);
        let envelope = rms_envelope(&samples);
        let avg = envelope.iter().sum::<f64>() / envelope.len() as f64;
        assert!((avg - 0.5 / 2.0f64.sqrt()).abs() < 0.02, "avg rms = {}", avg);
    }

    #[test]
    fn test_tempo_estimate_on_click_track() {
        let samples = click_track(120.0, 8.0);
        let envelope = rms_envelope(&samples);
        let (tempo, beats) = estimate_tempo(&envelope, SAMPLE_RATE as f64 / HOP_SIZE as f64);
        assert!(
            (tempo - 120.0).abs() < 15.0,
            "tempo = {} (expected ~120)",
            tempo
        );
        // 8 seconds at 120 BPM is 16 beats; allow edge effects.
        assert!((10..=22).contains(&beats), "beats = {}", beats);
    }

    #[test]
    fn test_silence_has_no_tempo() {
        let envelope = vec![0.0; 500];
        let (tempo, beats) = estimate_tempo(&envelope, 43.0);
        assert_eq!(tempo, 0.0);
        assert_eq!(beats, 0);
    }

    #[test]
    fn test_load_samples_roundtrip() {
        let temp = NamedTempFile::new().unwrap();
        let written: Vec<f32> = vec![0.0, 0.5, -1.0, 0.25];
        let bytes: Vec<u8> = written.iter().flat_map(|f| f.to_le_bytes()).collect();
        std::fs::write(temp.path(), &bytes).unwrap();

        let loaded = load_audio_samples(temp.path()).unwrap();
        assert_eq!(loaded.len(), 4);
        assert!((loaded[1] - 0.5).abs() < 1e-6);
        assert!((loaded[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_stream_is_no_audio() {
        let temp = NamedTempFile::new().unwrap();
        let samples = load_audio_samples(temp.path()).unwrap();
        assert!(samples.is_empty());
    }
}
