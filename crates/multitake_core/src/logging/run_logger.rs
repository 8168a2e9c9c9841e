//! Per-run logger with file and callback output.
//!
//! Each pipeline run gets its own logger that:
//! - Writes to a dedicated, timestamped log file
//! - Mirrors lines to an optional callback
//! - Filters progress in compact mode
//! - Keeps a tail of tool output for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Logger for one pipeline run.
pub struct RunLogger {
    run_name: String,
    log_path: PathBuf,
    started_at: DateTime<Local>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    last_progress: Mutex<Option<u32>>,
}

impl RunLogger {
    /// Create a logger writing to `<log_dir>/<run_name>_<YYYYmmdd_HHMMSS>.log`.
    pub fn new(
        run_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let run_name = run_name.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let started_at = Local::now();
        let log_path = log_dir.join(format!(
            "{}_{}.log",
            sanitize_filename(&run_name),
            started_at.format("%Y%m%d_%H%M%S")
        ));
        let file = File::create(&log_path)?;

        Ok(Self {
            run_name,
            log_path,
            started_at,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            last_progress: Mutex::new(None),
            config,
        })
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.output(&self.format_message(message));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn section(&self, section_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(section_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log a progress percentage. In compact mode only step boundaries and
    /// 100% get through.
    ///
    /// Returns true if the line was logged.
    pub fn progress(&self, percent: u32) -> bool {
        let percent = percent.min(100);
        if self.config.compact {
            let step = self.config.progress_step.max(1);
            let mut last = self.last_progress.lock();
            let current_step = percent / step;
            let passed = match *last {
                Some(prev) => current_step > prev / step || (percent == 100 && prev < 100),
                None => current_step > 0 || percent == 100,
            };
            if !passed {
                return false;
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Progress as `done` out of `total` items.
    pub fn progress_of(&self, done: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        self.progress(((done * 100) / total) as u32)
    }

    /// Record a line of tool output. Compact mode only keeps it in the tail.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 && buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            if self.config.error_tail > 0 {
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }
        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.output(&self.format_message(&format!("{}{}", prefix, line)));
    }

    /// Dump the tail buffer, typically after a failure.
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }
        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in &lines {
            self.output(&self.format_message(line));
        }
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Log the run outcome with elapsed wall time.
    pub fn finish(&self, success: bool) {
        let elapsed = Local::now().signed_duration_since(self.started_at);
        let secs = elapsed.num_milliseconds() as f64 / 1000.0;
        if success {
            self.success(&format!("{} finished in {:.1}s", self.run_name, secs));
        } else {
            self.error(&format!("{} failed after {:.1}s", self.run_name, secs));
        }
        self.flush();
    }

    pub fn flush(&self) {
        if let Some(writer) = self.file_writer.lock().as_mut() {
            let _ = writer.flush();
        }
    }

    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(writer) = self.file_writer.lock().as_mut() {
            let _ = writeln!(writer, "{}", formatted);
        }
        if let Some(callback) = &self.callback {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
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

    fn quiet() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn creates_timestamped_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("my run", dir.path(), quiet(), None).unwrap();

        assert!(logger.log_path().exists());
        let name = logger.log_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("my_run_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn writes_prefixed_lines_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run", dir.path(), quiet(), None).unwrap();

        logger.phase("Align");
        logger.warn("weak peak");
        logger.debug("hidden at info level");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("=== Align ==="));
        assert!(content.contains("[WARNING] weak peak"));
        assert!(!content.contains("hidden"));
    }

    #[test]
    fn mirrors_to_callback() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let callback: LogCallback = Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let logger = RunLogger::new("run", dir.path(), quiet(), Some(callback)).unwrap();
        logger.info("one");
        logger.success("two");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run", dir.path(), quiet(), None).unwrap();

        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
        assert!(!logger.progress(100));
    }

    #[test]
    fn progress_of_converts_counts() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: false,
            ..quiet()
        };
        let logger = RunLogger::new("run", dir.path(), config, None).unwrap();
        assert!(logger.progress_of(1, 4));
        assert!(!logger.progress_of(1, 0));
    }

    #[test]
    fn tail_buffer_keeps_latest_lines() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 3,
            ..quiet()
        };
        let logger = RunLogger::new("run", dir.path(), config, None).unwrap();

        for i in 0..6 {
            logger.output_line(&format!("line {}", i), true);
        }

        assert_eq!(logger.get_tail(), vec!["line 3", "line 4", "line 5"]);
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("take/one"), "take_one");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
