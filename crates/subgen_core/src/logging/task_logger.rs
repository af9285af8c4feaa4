//! Per-task logger with file and callback output.
//!
//! Each task gets its own logger that:
//! - Writes to a dedicated log file (when a log directory is configured)
//! - Sends every formatted line to a callback (the pipeline's log events)
//! - Supports compact mode with progress filtering
//! - Maintains a tail buffer of raw tool output for failure diagnosis
//! - Keeps unfiltered tool output out of the callback (file only)

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-task logger with dual output (file + callback).
pub struct TaskLogger {
    /// Path to log file, if one is written.
    log_path: Option<PathBuf>,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Callback for forwarding formatted lines.
    callback: Option<LogCallback>,
    /// Logging configuration.
    config: LogConfig,
    /// Recent raw tool output.
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<Option<u32>>,
}

impl TaskLogger {
    /// Create a new task logger.
    ///
    /// # Arguments
    /// * `task_name` - Name of the task (used in log filename)
    /// * `log_dir` - Directory to write the log file to, `None` for callback only
    /// * `config` - Logging configuration
    /// * `callback` - Optional receiver of formatted lines
    pub fn new(
        task_name: impl Into<String>,
        log_dir: Option<&Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let task_name: String = task_name.into();

        let (log_path, file_writer) = match log_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join(format!("{}.log", sanitize_filename(&task_name)));
                let file = File::create(&path)?;
                (Some(path), Some(BufWriter::new(file)))
            }
            None => (None, None),
        };

        Ok(Self {
            log_path,
            file_writer: Mutex::new(file_writer),
            callback,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            last_progress: Mutex::new(None),
        })
    }

    /// Logger that only forwards to the callback.
    pub fn callback_only(config: LogConfig, callback: LogCallback) -> Self {
        Self {
            log_path: None,
            file_writer: Mutex::new(None),
            callback: Some(callback),
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            last_progress: Mutex::new(None),
        }
    }

    /// Get the log file path.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a line already classified by the stream parser.
    pub fn tool(&self, prefix: MessagePrefix, line: &str) {
        self.log(LogLevel::Info, &prefix.format(line));
    }

    /// Log progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);

            if let Some(previous) = *last {
                // Only log at step intervals (e.g., 0%, 20%, 40%, ...)
                let current_step = (percent / step) * step;
                let last_step = (previous / step) * step;
                if current_step <= last_step && percent < 100 {
                    return false;
                }
                if previous >= 100 {
                    return false;
                }
            }
            *last = Some(percent);
        }

        let msg = format!("Progress: {}%", percent);
        self.log(LogLevel::Info, &msg);
        true
    }

    /// Forget the last logged progress value (a new stage starts at 0%).
    pub fn reset_progress(&self) {
        *self.last_progress.lock() = None;
    }

    /// Record a raw line of tool output.
    ///
    /// Always kept in the tail buffer. Outside compact mode it is also
    /// written to the log file, but never sent to the callback.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        self.record(line);

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[raw stderr] " } else { "[raw] " };
        let msg = format!("{}{}", prefix, line);
        self.write_file(&self.format_message(&msg));
    }

    /// Keep a line in the tail buffer without echoing it.
    pub fn record(&self, line: &str) {
        if self.config.error_tail == 0 {
            return;
        }

        let mut buffer = self.tail_buffer.lock();
        if buffer.len() >= self.config.error_tail {
            buffer.pop_front();
        }
        buffer.push_back(line.to_string());
    }

    /// Show the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    /// Clear the tail buffer (between stages).
    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        self.write_file(formatted);

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }

    fn write_file(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }
    }
}

impl Drop for TaskLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn quiet_config() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = TaskLogger::new("clip", Some(dir.path()), quiet_config(), None).unwrap();

        let path = logger.log_path().unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with("clip.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = TaskLogger::new("clip", Some(dir.path()), quiet_config(), None).unwrap();

        logger.phase("Extract");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("=== Extract ==="));
    }

    #[test]
    fn forwards_to_callback_without_file() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();
        let callback: LogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = TaskLogger::callback_only(quiet_config(), callback);
        logger.info("Message 1");
        logger.warn("Message 2");

        assert!(logger.log_path().is_none());
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn raw_output_stays_out_of_callback() {
        let dir = tempdir().unwrap();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let callback: LogCallback = Box::new(move |msg| sink.lock().push(msg.to_string()));
        let config = LogConfig {
            compact: false,
            ..quiet_config()
        };
        let logger = TaskLogger::new("clip", Some(dir.path()), config, Some(callback)).unwrap();

        logger.output_line("frame=  10 fps=0.0", true);
        logger.info("visible");
        logger.flush();

        assert_eq!(*lines.lock(), vec!["visible".to_string()]);
        assert_eq!(logger.get_tail(), vec!["frame=  10 fps=0.0".to_string()]);
        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("[raw stderr] frame=  10 fps=0.0"));
    }

    #[test]
    fn debug_lines_follow_configured_level() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let callback: LogCallback = Box::new(move |_msg| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let logger = TaskLogger::callback_only(quiet_config(), callback);
        logger.debug("hidden at info");
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let counter = count.clone();
        let callback: LogCallback = Box::new(move |_msg| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let config = LogConfig {
            level: LogLevel::Debug,
            ..quiet_config()
        };
        let logger = TaskLogger::callback_only(config, callback);
        logger.debug("shown at debug");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let logger = TaskLogger::new("clip", None, quiet_config(), None).unwrap();

        assert!(logger.progress(0));
        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
        assert!(!logger.progress(100));

        logger.reset_progress();
        assert!(logger.progress(0));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let config = LogConfig {
            error_tail: 5,
            ..quiet_config()
        };
        let logger = TaskLogger::new("clip", None, config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i), true);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");

        logger.clear_tail();
        assert!(logger.get_tail().is_empty());
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
