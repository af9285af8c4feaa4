//! Reassembly of raw output chunks into lines.

/// Buffers raw bytes and yields complete lines.
///
/// Both `\n` and `\r` terminate a line, so ffmpeg's carriage-return status
/// redraws come out as separate lines. A line split across two reads is
/// held back until its terminator arrives. Conversion to text happens per
/// complete line, which keeps multi-byte UTF-8 sequences intact.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the trimmed, non-empty lines it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take_line() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }

        lines
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.take_line()
    }

    /// Whether an unterminated fragment is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn take_line(&mut self) -> Option<String> {
        let bytes = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&bytes);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_returns_split_lines() {
        let mut assembler = LineAssembler::new();
        let lines = assembler.push(b"frame=1 time=00:00:01.00\rframe=2 time=00:00:02.00\r\n");
        assert_eq!(
            lines,
            vec!["frame=1 time=00:00:01.00", "frame=2 time=00:00:02.00"]
        );
        assert!(!assembler.has_pending());
    }

    #[test]
    fn fragments_are_reassembled() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.push(b"  Duration: 00:0").is_empty());
        assert!(assembler.has_pending());

        let lines = assembler.push(b"0:10.50, start: 0.000000\n");
        assert_eq!(lines, vec!["Duration: 00:00:10.50, start: 0.000000"]);
    }

    #[test]
    fn split_utf8_sequence_survives() {
        let text = "转录完成\n".as_bytes();
        let mut assembler = LineAssembler::new();
        assert!(assembler.push(&text[..4]).is_empty());
        assert_eq!(assembler.push(&text[4..]), vec!["转录完成"]);
    }

    #[test]
    fn finish_flushes_unterminated_tail() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"last words");
        assert_eq!(assembler.finish().as_deref(), Some("last words"));
        assert_eq!(assembler.finish(), None);
    }
}
