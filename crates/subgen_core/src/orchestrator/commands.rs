//! Command lines for each stage.

use std::path::Path;

use crate::config::TranscriptionSettings;
use crate::models::{TaskPaths, RENDER_SUBTITLE_NAME};
use crate::runner::CommandSpec;

/// Decode the input into mono 16 kHz WAV.
pub fn extract_command(ffmpeg: &str, paths: &TaskPaths) -> CommandSpec {
    CommandSpec::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(&paths.input)
        .args(["-ac", "1", "-ar", "16000", "-f", "wav"])
        .arg(&paths.temp_audio)
}

/// Run the transcription script on the extracted audio.
pub fn transcribe_command(
    python: &str,
    script: &Path,
    paths: &TaskPaths,
    transcription: &TranscriptionSettings,
) -> CommandSpec {
    CommandSpec::new(python)
        .arg(script)
        .arg(&paths.temp_audio)
        .arg(&paths.subtitle)
        .arg("--engine")
        .arg(transcription.engine.as_arg())
        .arg("--model")
        .arg(transcription.model.as_arg())
}

/// Burn the render copy of the subtitle into a re-encoded video.
///
/// Runs inside the target directory so the filter can name the subtitle
/// without any path escaping.
pub fn embed_command(ffmpeg: &str, paths: &TaskPaths) -> CommandSpec {
    CommandSpec::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(&paths.input)
        .arg("-vf")
        .arg(format!("subtitles='{}'", RENDER_SUBTITLE_NAME))
        .args(["-c:v", "libx264", "-preset", "fast", "-c:a", "copy"])
        .arg(&paths.output_video)
        .work_dir(&paths.target_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Engine, ModelSize};
    use std::path::PathBuf;

    fn paths() -> TaskPaths {
        TaskPaths::derive("/videos/clip.mp4", "/out")
    }

    #[test]
    fn extract_writes_mono_wav_beside_input() {
        let spec = extract_command("ffmpeg", &paths());
        assert_eq!(spec.program, "ffmpeg");
        assert_eq!(
            spec.args_lossy(),
            vec![
                "-y",
                "-i",
                "/videos/clip.mp4",
                "-ac",
                "1",
                "-ar",
                "16000",
                "-f",
                "wav",
                "/videos/clip_temp_audio.wav"
            ]
        );
        assert_eq!(spec.work_dir, None);
    }

    #[test]
    fn transcribe_passes_engine_and_model() {
        let settings = TranscriptionSettings {
            engine: Engine::Whisper,
            model: ModelSize::Medium,
        };
        let script = Path::new("/opt/transcribe.py");
        let spec = transcribe_command("python3", script, &paths(), &settings);
        assert_eq!(
            spec.args_lossy(),
            vec![
                "/opt/transcribe.py",
                "/videos/clip_temp_audio.wav",
                "/out/clip.srt",
                "--engine",
                "whisper",
                "--model",
                "medium"
            ]
        );
    }

    #[test]
    fn embed_runs_in_target_dir_with_render_copy() {
        let spec = embed_command("ffmpeg", &paths());
        let args = spec.args_lossy();
        assert_eq!(args[3], "-vf");
        assert_eq!(args[4], "subtitles='temp_render_subs.srt'");
        assert_eq!(args.last().map(String::as_str), Some("/out/clip_subtitled.mp4"));
        assert_eq!(spec.work_dir, Some(PathBuf::from("/out")));
    }
}
