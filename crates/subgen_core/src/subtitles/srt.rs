//! SubRip scanning.
//!
//! Entries look like:
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:04,000
//! Hello, world!
//! ```
//! separated by blank lines. The index line is optional.

/// Count entries with a valid timing line followed by text.
pub fn count_srt_entries(content: &str) -> usize {
    let content = content.replace("\r\n", "\n").replace('\r', "\n");

    content
        .split("\n\n")
        .filter(|block| is_entry(block.trim()))
        .count()
}

fn is_entry(block: &str) -> bool {
    let lines: Vec<&str> = block.lines().collect();
    let Some(timing_idx) = lines.iter().position(|l| l.contains(" --> ")) else {
        return false;
    };

    let has_text = lines[timing_idx + 1..].iter().any(|l| !l.trim().is_empty());
    has_text && parse_srt_timing(lines[timing_idx]).is_some()
}

/// Parse `HH:MM:SS,mmm --> HH:MM:SS,mmm` into milliseconds.
fn parse_srt_timing(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once(" --> ")?;
    // Positioning hints (`X1:.. Y1:..`) may follow the end time.
    let end = end.split_whitespace().next()?;
    Some((parse_srt_time(start)?, parse_srt_time(end)?))
}

/// Parse `HH:MM:SS,mmm` (or with a period) into milliseconds.
pub fn parse_srt_time(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', ".");

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }

    Some((hours * 3600.0 + minutes * 60.0 + seconds) * 1000.0)
}
