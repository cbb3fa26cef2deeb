//! Prompt construction.
//!
//! Prompts embed the locally extracted features so the model grounds its
//! critique in measured values rather than guessing. The cloud prompt
//! accompanies the uploaded media; the local prompt is text-only and
//! carries extra frame metrics to compensate for the missing video.

use cine_models::FeatureSummary;
use serde_json::Value;

/// System message for local analysis completions.
pub const ANALYSIS_SYSTEM_MESSAGE: &str =
    "You are a professional film critic and cinematographer.";

/// System message for local chat completions.
pub const CHAT_SYSTEM_MESSAGE: &str = "You are a helpful creative director assistant.";

fn tempo_str(summary: &FeatureSummary) -> String {
    summary
        .audio
        .as_ref()
        .and_then(|a| a.tempo())
        .map(|t| format!("{:.1}", t))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Prompt for the cloud multimodal provider, sent alongside the media.
pub fn analysis_prompt(summary: &FeatureSummary) -> String {
    let tempo = tempo_str(summary);
    format!(
        r#"Act as a world-class film critic, editor, and cinematographer.
Analyze this music video comprehensively.

Local analysis has detected:
- Duration: {duration:.2}s
- FPS: {fps}
- Resolution: {width}x{height}
- Audio tempo: {tempo} BPM
- Scene changes detected: {scene_count}

Provide a professional critique covering:
1. Storytelling & Concept
2. Editing Rhythm & Pacing (considering the {tempo} BPM tempo)
3. Cinematography & Lighting
4. Music Integration

Then, identify specific weak moments with timestamps, issues, and fixes.
Be harsh but constructive.

Return as JSON with structure:
{{
  "summary": {{
    "storytelling": "...",
    "editing": "...",
    "cinematography": "...",
    "musicIntegration": "...",
    "verdict": "..."
  }},
  "timeline": [
    {{
      "timestamp": "MM:SS",
      "seconds": 0,
      "title": "...",
      "issue": "...",
      "reason": "...",
      "fix": "...",
      "severity": 0-10
    }}
  ]
}}
"#,
        duration = summary.metadata.duration,
        fps = summary.metadata.fps,
        width = summary.metadata.width,
        height = summary.metadata.height,
        tempo = tempo,
        scene_count = summary.scenes.len(),
    )
}

/// Text-only prompt for the local model, which never sees the media.
pub fn local_analysis_prompt(summary: &FeatureSummary) -> String {
    let tempo = tempo_str(summary);
    let energy = summary
        .audio
        .as_ref()
        .and_then(|a| a.avg_energy())
        .map(|e| format!("{:.4}", e))
        .unwrap_or_else(|| "N/A".to_string());
    let brightness = summary
        .avg_brightness()
        .map(|b| format!("{:.1}", b))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        r#"Based on the following video metadata and extracted features, provide a professional critique:

Metadata:
- Duration: {duration:.2}s
- Resolution: {width}x{height}
- FPS: {fps}

Audio Features:
- Tempo: {tempo} BPM
- Average Energy: {energy}

Video Features:
- Frames analyzed: {frame_count}
- Scene changes: {scene_count}
- Average brightness: {brightness}

Provide analysis in this JSON format:
{{
  "summary": {{
    "storytelling": "Based on pacing and scene changes...",
    "editing": "Rhythm analysis based on tempo and cuts...",
    "cinematography": "Technical assessment...",
    "musicIntegration": "Tempo and beat alignment...",
    "verdict": "Overall assessment..."
  }},
  "timeline": []
}}
"#,
        duration = summary.metadata.duration,
        width = summary.metadata.width,
        height = summary.metadata.height,
        fps = summary.metadata.fps,
        tempo = tempo,
        energy = energy,
        frame_count = summary.frames.len(),
        scene_count = summary.scenes.len(),
        brightness = brightness,
    )
}

/// Chat message, optionally prefixed with a JSON context block.
pub fn chat_prompt(message: &str, context: Option<&Value>) -> String {
    match context {
        Some(ctx) => {
            let ctx_str = serde_json::to_string_pretty(ctx).unwrap_or_else(|_| "{}".to_string());
            format!("Context: {}\n\nUser: {}", ctx_str, message)
        }
        None => message.to_string(),
    }
}
