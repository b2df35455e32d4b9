// Logging - trace logging for VDP and CDD execution
//
// Provides:
// - Per-line VDP trace logging
// - Per-tick CDD trace logging
// - Configurable log levels
// - Log output to file or memory

use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warning,
    /// Info, warnings, and errors
    Info,
    /// Debug information (includes traces)
    Debug,
    /// Verbose trace logging
    Trace,
}

/// One scanline's worth of VDP state, captured for trace comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VdpLineTrace {
    pub line: u16,
    pub hint_pending: bool,
    pub vint_pending: bool,
    pub sprite_count: u8,
    pub sprite_overflow: bool,
    pub sprite_collision: bool,
}

impl std::fmt::Display for VdpLineTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line={:3} hint={} vint={} sprites={} overflow={} collision={}",
            self.line,
            self.hint_pending as u8,
            self.vint_pending as u8,
            self.sprite_count,
            self.sprite_overflow,
            self.sprite_collision
        )
    }
}

/// One CDD interrupt tick's worth of state, captured for trace comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CddTickTrace {
    pub status: String,
    pub lba: i32,
    pub index: u8,
    pub last_command: Option<u8>,
}

impl std::fmt::Display for CddTickTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "status={} lba={} index={} cmd={:?}",
            self.status, self.lba, self.index, self.last_command
        )
    }
}

/// Trace entry
///
/// Represents a single trace log entry
#[derive(Debug, Clone)]
pub enum TraceEntry {
    /// VDP per-line trace
    Vdp(VdpLineTrace),
    /// CDD per-tick trace
    Cdd(CddTickTrace),
    /// Custom message
    Message(String),
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEntry::Vdp(state) => write!(f, "VDP: {}", state),
            TraceEntry::Cdd(state) => write!(f, "CDD: {}", state),
            TraceEntry::Message(msg) => write!(f, "{}", msg),
        }
    }
}

/// Logger
///
/// Handles trace logging for VDP and CDD execution.
/// Can log to memory buffer or file.
pub struct Logger {
    /// Current log level
    log_level: LogLevel,

    /// Enable VDP trace logging
    vdp_trace: bool,

    /// Enable CDD trace logging
    cdd_trace: bool,

    /// In-memory trace buffer
    trace_buffer: Vec<TraceEntry>,

    /// Maximum number of entries in trace buffer (0 = unlimited)
    max_buffer_size: usize,

    /// Output file
    output_file: Option<File>,
}

impl Logger {
    /// Create a new logger
    pub fn new() -> Self {
        Logger {
            log_level: LogLevel::None,
            vdp_trace: false,
            cdd_trace: false,
            trace_buffer: Vec::new(),
            max_buffer_size: 10000,
            output_file: None,
        }
    }

    /// Set the log level
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    /// Get the current log level
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Enable VDP trace logging
    pub fn enable_vdp_trace(&mut self) {
        self.vdp_trace = true;
    }

    /// Disable VDP trace logging
    pub fn disable_vdp_trace(&mut self) {
        self.vdp_trace = false;
    }

    /// Check if VDP trace logging is enabled
    pub fn is_vdp_trace_enabled(&self) -> bool {
        self.vdp_trace && self.log_level >= LogLevel::Trace
    }

    /// Enable CDD trace logging
    pub fn enable_cdd_trace(&mut self) {
        self.cdd_trace = true;
    }

    /// Disable CDD trace logging
    pub fn disable_cdd_trace(&mut self) {
        self.cdd_trace = false;
    }

    /// Check if CDD trace logging is enabled
    pub fn is_cdd_trace_enabled(&self) -> bool {
        self.cdd_trace && self.log_level >= LogLevel::Trace
    }

    /// Set maximum trace buffer size (0 = unlimited)
    pub fn set_max_buffer_size(&mut self, size: usize) {
        self.max_buffer_size = size;

        if size > 0 && self.trace_buffer.len() > size {
            self.trace_buffer.drain(0..self.trace_buffer.len() - size);
        }
    }

    /// Open a log file for output
    pub fn open_log_file<P: AsRef<Path>>(&mut self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        self.output_file = Some(file);
        Ok(())
    }

    /// Close the log file
    pub fn close_log_file(&mut self) {
        self.output_file = None;
    }

    /// Log a VDP line trace
    pub fn log_vdp_line(&mut self, trace: VdpLineTrace) {
        if !self.is_vdp_trace_enabled() {
            return;
        }
        self.add_entry(TraceEntry::Vdp(trace));
    }

    /// Log a CDD tick trace
    pub fn log_cdd_tick(&mut self, trace: CddTickTrace) {
        if !self.is_cdd_trace_enabled() {
            return;
        }
        self.add_entry(TraceEntry::Cdd(trace));
    }

    /// Log a message
    pub fn log_message(&mut self, level: LogLevel, message: String) {
        if level > self.log_level {
            return;
        }
        self.add_entry(TraceEntry::Message(message));
    }

    fn add_entry(&mut self, entry: TraceEntry) {
        if let Some(ref mut file) = self.output_file {
            let _ = writeln!(file, "{}", entry);
        }

        self.trace_buffer.push(entry);

        if self.max_buffer_size > 0 && self.trace_buffer.len() > self.max_buffer_size {
            self.trace_buffer.remove(0);
        }
    }

    /// Get the trace buffer
    pub fn trace_buffer(&self) -> &[TraceEntry] {
        &self.trace_buffer
    }

    /// Clear the trace buffer
    pub fn clear_buffer(&mut self) {
        self.trace_buffer.clear();
    }

    /// Get the last N trace entries
    pub fn last_entries(&self, count: usize) -> &[TraceEntry] {
        let start = self.trace_buffer.len().saturating_sub(count);
        &self.trace_buffer[start..]
    }

    /// Format the entire trace buffer as a string
    pub fn format_trace_buffer(&self) -> String {
        let mut output = String::new();
        for entry in &self.trace_buffer {
            output.push_str(&format!("{}\n", entry));
        }
        output
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_creation() {
        let logger = Logger::new();
        assert_eq!(logger.log_level(), LogLevel::None);
        assert!(!logger.is_vdp_trace_enabled());
        assert!(!logger.is_cdd_trace_enabled());
    }

    #[test]
    fn test_set_log_level() {
        let mut logger = Logger::new();
        logger.set_log_level(LogLevel::Debug);
        assert_eq!(logger.log_level(), LogLevel::Debug);
        logger.set_log_level(LogLevel::Trace);
        assert_eq!(logger.log_level(), LogLevel::Trace);
    }

    #[test]
    fn test_vdp_trace_toggle() {
        let mut logger = Logger::new();
        logger.enable_vdp_trace();
        logger.set_log_level(LogLevel::Trace);
        assert!(logger.is_vdp_trace_enabled());
        logger.disable_vdp_trace();
        assert!(!logger.is_vdp_trace_enabled());
    }

    #[test]
    fn test_trace_requires_trace_level() {
        let mut logger = Logger::new();
        logger.enable_cdd_trace();
        logger.set_log_level(LogLevel::Debug);
        assert!(!logger.is_cdd_trace_enabled());
        logger.set_log_level(LogLevel::Trace);
        assert!(logger.is_cdd_trace_enabled());
    }

    #[test]
    fn test_log_message() {
        let mut logger = Logger::new();
        logger.set_log_level(LogLevel::Info);
        logger.log_message(LogLevel::Info, "test".to_string());
        assert_eq!(logger.trace_buffer().len(), 1);
        match &logger.trace_buffer()[0] {
            TraceEntry::Message(msg) => assert_eq!(msg, "test"),
            _ => panic!("expected message entry"),
        }
    }

    #[test]
    fn test_max_buffer_size() {
        let mut logger = Logger::new();
        logger.set_log_level(LogLevel::Info);
        logger.set_max_buffer_size(3);
        for i in 0..4 {
            logger.log_message(LogLevel::Info, i.to_string());
        }
        assert_eq!(logger.trace_buffer().len(), 3);
        match &logger.trace_buffer()[0] {
            TraceEntry::Message(msg) => assert_eq!(msg, "1"),
            _ => panic!("expected message entry"),
        }
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::None < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_vdp_line_trace_display() {
        let trace = VdpLineTrace {
            line: 10,
            hint_pending: true,
            vint_pending: false,
            sprite_count: 5,
            sprite_overflow: false,
            sprite_collision: true,
        };
        let text = format!("{}", trace);
        assert!(text.contains("line= 10"));
        assert!(text.contains("sprites=5"));
    }
}
