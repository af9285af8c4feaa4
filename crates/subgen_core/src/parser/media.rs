//! Free-text progress printed by ffmpeg on stderr.

use super::Progress;
use crate::models::Stage;

const DURATION_MARKER: &str = "Duration: ";
const TIME_MARKER: &str = "time=";

/// Durations at or below this are treated as "not known yet".
const MIN_DURATION_SECS: f64 = 0.1;

const NOTABLE_KEYWORDS: [&str; 5] = ["error", "warning", "exception", "traceback", "download"];

/// What one stderr line contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaLine {
    /// Total duration found on this line.
    pub duration_secs: Option<f64>,
    /// Progress derived from a `time=` field.
    pub progress: Option<Progress>,
    /// The line itself, if it is worth logging.
    pub log: Option<String>,
}

/// Classify one stderr line.
///
/// `total_secs` is the duration accumulated so far for the current stage.
/// Duration and time fields are only read during stages that run ffmpeg;
/// spinner filtering and keyword logging apply to every stage.
pub fn parse_media_line(stage: Stage, total_secs: Option<f64>, line: &str) -> MediaLine {
    let line = line.trim();
    let mut parsed = MediaLine::default();
    if line.is_empty() {
        return parsed;
    }

    let known_total = total_secs.filter(|t| *t > MIN_DURATION_SECS);

    if stage.runs_media_tool() {
        if known_total.is_none() {
            let field = field_after(line, DURATION_MARKER, |c| c == ',' || c.is_whitespace());
            parsed.duration_secs = field
                .and_then(parse_timestamp)
                .filter(|t| *t > MIN_DURATION_SECS);
        }

        if let Some(total) = known_total.or(parsed.duration_secs) {
            parsed.progress = field_after(line, TIME_MARKER, char::is_whitespace)
                .and_then(parse_timestamp)
                .and_then(|elapsed| {
                    let ratio = (elapsed / total).clamp(0.0, 1.0);
                    let percent = (ratio * 100.0) as u8;
                    media_overall(stage, percent).map(|overall| Progress {
                        overall,
                        stage_percent: percent,
                    })
                });
        }
    }

    if !is_spinner(line) && is_notable(line) {
        parsed.log = Some(line.to_string());
    }

    parsed
}

/// Map a stage percentage onto the overall bar.
///
/// Extract covers 0-30, Embed covers 80-100. Other stages have no
/// free-text progress.
pub fn media_overall(stage: Stage, percent: u8) -> Option<u8> {
    let percent = f64::from(percent.min(100));
    match stage {
        Stage::Extract => Some(((percent * 0.3) as u8).min(30)),
        Stage::Embed => Some((80 + (percent * 0.2) as u8).min(100)),
        _ => None,
    }
}

/// Parse `H:MM:SS.ss` into seconds.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    total.is_finite().then_some(total)
}

/// tqdm-style progress bar (`45%|████      | 9/20 [00:01<00:02]`).
pub fn is_spinner(line: &str) -> bool {
    line.contains('|') && line.contains('/') && line.contains('[')
}

/// Whether a stderr line mentions something a user should see.
pub fn is_notable(line: &str) -> bool {
    let lowered = line.to_lowercase();
    NOTABLE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Text after `marker` up to the first character matching `end`.
fn field_after<'a>(line: &'a str, marker: &str, end: impl Fn(char) -> bool) -> Option<&'a str> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];
    let stop = rest.find(end).unwrap_or(rest.len());
    Some(&rest[..stop])
}

/// Stage-scoped duration accumulator around [`parse_media_line`].
#[derive(Debug, Default)]
pub struct MediaProgress {
    total_duration_secs: Option<f64>,
}

impl MediaProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the duration; called when Extract or Embed starts.
    pub fn reset(&mut self) {
        self.total_duration_secs = None;
    }

    pub fn total_duration_secs(&self) -> Option<f64> {
        self.total_duration_secs
    }

    /// Parse a line, remembering the first duration seen.
    pub fn feed(&mut self, stage: Stage, line: &str) -> MediaLine {
        let parsed = parse_media_line(stage, self.total_duration_secs, line);
        if self.total_duration_secs.is_none() {
            if let Some(duration) = parsed.duration_secs {
                self.total_duration_secs = Some(duration);
            }
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DURATION_LINE: &str = "  Duration: 00:00:10.00, start: 0.000000, bitrate: 1205 kb/s";

    fn progress_at(stage: Stage, elapsed: &str) -> Option<u8> {
        let line = format!("size=  256kB time={} bitrate= 209.7kbits/s speed=40x", elapsed);
        parse_media_line(stage, Some(10.0), &line)
            .progress
            .map(|p| p.overall)
    }

    #[test]
    fn parses_timestamps() {
        assert_eq!(parse_timestamp("01:02:03.50"), Some(3723.5));
        assert_eq!(parse_timestamp("0:00:10.5"), Some(10.5));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("00:10"), None);
        assert_eq!(parse_timestamp("aa:bb:cc"), None);
    }

    #[test]
    fn extract_maps_to_first_band() {
        assert_eq!(progress_at(Stage::Extract, "00:00:00.00"), Some(0));
        assert_eq!(progress_at(Stage::Extract, "00:00:05.00"), Some(15));
        assert_eq!(progress_at(Stage::Extract, "00:00:10.00"), Some(30));
        // overshoot is clamped
        assert_eq!(progress_at(Stage::Extract, "00:00:12.00"), Some(30));
    }

    #[test]
    fn embed_maps_to_last_band() {
        assert_eq!(progress_at(Stage::Embed, "00:00:00.00"), Some(80));
        assert_eq!(progress_at(Stage::Embed, "00:00:05.00"), Some(90));
        assert_eq!(progress_at(Stage::Embed, "00:00:10.00"), Some(100));
    }

    #[test]
    fn negative_time_clamps_to_zero() {
        assert_eq!(progress_at(Stage::Embed, "-00:00:00.02"), Some(80));
    }

    #[test]
    fn time_without_duration_is_ignored() {
        let parsed = parse_media_line(Stage::Extract, None, "size=1kB time=00:00:05.00 bitrate=1");
        assert_eq!(parsed, MediaLine::default());
    }

    #[test]
    fn transcribe_stage_ignores_ffmpeg_fields() {
        let parsed = parse_media_line(Stage::Transcribe, None, DURATION_LINE);
        assert_eq!(parsed.duration_secs, None);
        assert_eq!(progress_at(Stage::Transcribe, "00:00:05.00"), None);
    }

    #[test]
    fn first_duration_wins_until_reset() {
        let mut media = MediaProgress::new();
        media.feed(Stage::Extract, DURATION_LINE);
        media.feed(Stage::Extract, "  Duration: 00:01:00.00, start: 0.0");
        assert_eq!(media.total_duration_secs(), Some(10.0));

        media.reset();
        media.feed(Stage::Embed, "  Duration: 00:01:00.00, start: 0.0");
        assert_eq!(media.total_duration_secs(), Some(60.0));
    }

    #[test]
    fn unknown_duration_does_not_stick() {
        let mut media = MediaProgress::new();
        media.feed(Stage::Extract, "  Duration: N/A, bitrate: N/A");
        assert_eq!(media.total_duration_secs(), None);
    }

    #[test]
    fn only_notable_lines_are_logged() {
        let quiet = parse_media_line(Stage::Extract, None, "Stream #0:0: Video: h264");
        assert_eq!(quiet.log, None);

        let warn = parse_media_line(Stage::Extract, None, "[mp4 @ 0x1] WARNING: something odd");
        assert_eq!(warn.log.as_deref(), Some("[mp4 @ 0x1] WARNING: something odd"));

        let trace = parse_media_line(Stage::Transcribe, None, "Traceback (most recent call last):");
        assert!(trace.log.is_some());
    }

    #[test]
    fn spinner_lines_are_dropped() {
        let line = "Downloading model:  45%|████▌     | 9/20 [00:01<00:02, 5.1it/s]";
        assert!(is_spinner(line));
        assert_eq!(parse_media_line(Stage::Transcribe, None, line).log, None);
    }
}
