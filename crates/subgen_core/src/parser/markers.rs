//! Structured progress markers printed by the transcription script.

use super::Progress;

const DOWNLOAD_MARKER: &str = "DOWNLOAD_PROGRESS:";
const TRANSCRIBE_MARKER: &str = "TRANS_PROGRESS:";

/// Start of the transcription band on the overall bar.
const TRANSCRIBE_BASE: u8 = 30;

/// Meaning of one stdout line from the transcriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriberLine {
    /// Model download percentage. Status text only, not on the overall bar.
    Download(u8),
    /// Transcription progress mapped onto the overall bar.
    Progress(Progress),
    /// Anything else, forwarded verbatim.
    Log(String),
}

/// Classify one stdout line.
///
/// Returns `None` for blank lines and for markers whose value is not an
/// integer.
pub fn parse_transcriber_line(line: &str) -> Option<TranscriberLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.contains(DOWNLOAD_MARKER) {
        return marker_value(line, DOWNLOAD_MARKER).map(TranscriberLine::Download);
    }

    if line.contains(TRANSCRIBE_MARKER) {
        return marker_value(line, TRANSCRIBE_MARKER).map(|percent| {
            TranscriberLine::Progress(Progress {
                overall: transcribe_overall(percent),
                stage_percent: percent,
            })
        });
    }

    Some(TranscriberLine::Log(line.to_string()))
}

/// Map transcription percent onto the 30-80 band of the overall bar.
pub fn transcribe_overall(percent: u8) -> u8 {
    TRANSCRIBE_BASE + percent.min(100) / 2
}

/// Integer following the last occurrence of `marker`, clamped to 0-100.
fn marker_value(line: &str, marker: &str) -> Option<u8> {
    let idx = line.rfind(marker)?;
    let value: i64 = line[idx + marker.len()..].trim().parse().ok()?;
    Some(value.clamp(0, 100) as u8)
}
