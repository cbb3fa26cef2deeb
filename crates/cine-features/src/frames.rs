//! Streaming frame scan.
//!
//! FFmpeg decodes the source to raw grayscale frames on stdout; a single
//! sequential pass feeds every frame through scene-cut detection while
//! frames on the sampling grid additionally get brightness and
//! motion-blur metrics. Only the previous frame's luma plane is retained.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use cine_models::{FrameSample, SceneCut};

use crate::error::{FeatureError, FeatureResult};

/// Mean-absolute-luma-difference threshold for a scene cut (0-255 scale).
pub const SCENE_CUT_THRESHOLD: f64 = 30.0;

/// Output of the frame scan.
#[derive(Debug, Default)]
pub struct FrameScan {
    pub frames: Vec<FrameSample>,
    pub scenes: Vec<SceneCut>,
    /// Frames actually decoded (may be short of the probed count)
    pub decoded_frames: u64,
}

/// Stateful scene-cut detector over consecutive grayscale frames.
///
/// Streaming and one-pass: feed frames in order, collect cuts at the end.
pub struct SceneCutDetector {
    threshold: f64,
    fps: f64,
    prev: Option<Vec<u8>>,
    cuts: Vec<SceneCut>,
}

impl SceneCutDetector {
    pub fn new(threshold: f64, fps: f64) -> Self {
        Self {
            threshold,
            fps,
            prev: None,
            cuts: Vec::new(),
        }
    }

    /// Feed the next frame's luma plane; frames must arrive in order.
    pub fn feed(&mut self, frame_index: u64, luma: &[u8]) {
        if let Some(prev) = &self.prev {
            if prev.len() == luma.len() {
                let diff = mean_abs_diff(prev, luma);
                if diff > self.threshold {
                    self.cuts.push(SceneCut {
                        frame_index,
                        timestamp: timestamp_of(frame_index, self.fps),
                        intensity: diff,
                    });
                }
            }
        }
        self.prev = Some(luma.to_vec());
    }

    /// Cuts detected so far, ordered by frame index.
    pub fn into_cuts(self) -> Vec<SceneCut> {
        self.cuts
    }
}

/// Scan a video's frames, sampling metrics every `frame_interval` frames.
///
/// Failure to start the decode is fatal; a stream that ends early (damaged
/// tail, truncated upload) just stops the scan with whatever was decoded.
pub fn scan_frames(
    path: &Path,
    width: u32,
    height: u32,
    fps: f64,
    frame_interval: u64,
    sample_frames: bool,
) -> FeatureResult<FrameScan> {
    if width == 0 || height == 0 {
        return Err(FeatureError::decode_failure("zero frame dimensions"));
    }

    which::which("ffmpeg").map_err(|_| FeatureError::FfmpegNotFound)?;

    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(["-f", "rawvideo", "-pix_fmt", "gray", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| FeatureError::decode_failure(format!("failed to spawn ffmpeg: {}", e)))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| FeatureError::internal("ffmpeg stdout not captured"))?;

    let frame_len = width as usize * height as usize;
    let mut buf = vec![0u8; frame_len];
    let interval = frame_interval.max(1);
    let resolution = format!("{}x{}", width, height);

    let mut detector = SceneCutDetector::new(SCENE_CUT_THRESHOLD, fps);
    let mut frames = Vec::new();
    let mut frame_index: u64 = 0;

    loop {
        match stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                // A mid-stream read error ends the scan, not the request.
                warn!(frame = frame_index, error = %e, "Frame decode stopped early");
                break;
            }
        }

        detector.feed(frame_index, &buf);

        if sample_frames && frame_index % interval == 0 {
            frames.push(FrameSample {
                frame_index,
                timestamp: timestamp_of(frame_index, fps),
                brightness: mean_luma(&buf),
                motion_blur: laplacian_variance(&buf, width as usize, height as usize),
                resolution: resolution.clone(),
            });
        }

        frame_index += 1;
    }

    let status = child.wait()?;
    if frame_index == 0 {
        return Err(FeatureError::decode_failure(format!(
            "ffmpeg produced no frames (exit: {:?})",
            status.code()
        )));
    }

    let scenes = detector.into_cuts();
    debug!(
        decoded = frame_index,
        sampled = frames.len(),
        cuts = scenes.len(),
        "Frame scan complete"
    );

    Ok(FrameScan {
        frames,
        scenes,
        decoded_frames: frame_index,
    })
}

fn timestamp_of(frame_index: u64, fps: f64) -> f64 {
    if fps > 0.0 {
        frame_index as f64 / fps
    } else {
        0.0
    }
}

/// Mean luma of a grayscale plane (0-255).
pub fn mean_luma(luma: &[u8]) -> f64 {
    if luma.is_empty() {
        return 0.0;
    }
    let sum: u64 = luma.iter().map(|&v| v as u64).sum();
    sum as f64 / luma.len() as f64
}

/// Mean absolute pixel difference between two equal-length luma planes.
pub fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let sum: u64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as i64 - y as i64).unsigned_abs())
        .sum();
    sum as f64 / a.len() as f64
}

/// Variance of the 3x3 Laplacian over a grayscale plane.
///
/// Low variance indicates a blurred frame. Border pixels are skipped.
pub fn laplacian_variance(luma: &[u8], width: usize, height: usize) -> f64 {
    if width < 3 || height < 3 || luma.len() < width * height {
        return 0.0;
    }

    let mut responses = Vec::with_capacity((width - 2) * (height - 2));
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = luma[y * width + x] as f64;
            let up = luma[(y - 1) * width + x] as f64;
            let down = luma[(y + 1) * width + x] as f64;
            let left = luma[y * width + x - 1] as f64;
            let right = luma[y * width + x + 1] as f64;
            responses.push(up + down + left + right - 4.0 * center);
        }
    }

    let n = responses.len() as f64;
    let mean = responses.iter().sum::<f64>() / n;
    responses.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n
}
