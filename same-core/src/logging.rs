//! Structured logging for the EAS Station core
//!
//! Hand-rolled rather than built on `log`/`tracing`: entries are collected
//! so the CLI and any future admin UI can replay them, filter by subsystem,
//! and attach them to a specific alert or activation without wiring a
//! separate subscriber.

use std::fmt;

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to record
    pub level: LogLevel,

    /// Per-subsystem enable flags
    pub enable_audio: bool,
    pub enable_decode: bool,
    pub enable_gpio: bool,
    pub enable_monitor: bool,

    /// Maximum number of log entries to keep (for memory management)
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            enable_audio: true,
            enable_decode: true,
            enable_gpio: true,
            enable_monitor: true,
            max_entries: 2000,
        }
    }
}

impl LogConfig {
    /// Verbose logging for debugging a decode or monitor issue in the field
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            enable_audio: true,
            enable_decode: true,
            enable_gpio: true,
            enable_monitor: true,
            max_entries: 10_000,
        }
    }

    /// Quiet logging for unattended production operation
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Warn,
            enable_audio: false,
            enable_decode: false,
            enable_gpio: true,
            enable_monitor: true,
            max_entries: 500,
        }
    }
}

/// A single log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub subsystem: &'static str,
    pub message: String,
}

/// Logger that collects structured log entries in memory
#[derive(Debug, Clone)]
pub struct SignalLogger {
    config: LogConfig,
    entries: Vec<LogEntry>,
}

impl SignalLogger {
    pub fn new(config: LogConfig) -> Self {
        let capacity = config.max_entries.min(2000);
        Self {
            config,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Log a message at the specified level
    pub fn log(&mut self, level: LogLevel, subsystem: &'static str, message: impl fmt::Display) {
        if level < self.config.level {
            return;
        }

        let enabled = match subsystem {
            "AUDIO" | "SCAN" | "BROADCAST" => self.config.enable_audio,
            "DECODE" | "FSK" | "SYNC" | "DLL" => self.config.enable_decode,
            "GPIO" | "WATCHDOG" => self.config.enable_gpio,
            "MONITOR" | "DEDUP" | "FIPS" => self.config.enable_monitor,
            _ => true,
        };

        if !enabled {
            return;
        }

        let entry = LogEntry {
            level,
            subsystem,
            message: message.to_string(),
        };

        if self.config.max_entries > 0 {
            if self.entries.len() >= self.config.max_entries {
                self.entries.remove(0);
            }
            self.entries.push(entry);
        }

        #[cfg(any(test, debug_assertions))]
        {
            eprintln!("[{}] {}: {}", level, subsystem, message);
        }
    }

    pub fn trace(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Trace, subsystem, message);
    }

    pub fn debug(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Debug, subsystem, message);
    }

    pub fn info(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Info, subsystem, message);
    }

    pub fn warn(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Warn, subsystem, message);
    }

    pub fn error(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Error, subsystem, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_for_subsystem(&self, subsystem: &str) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.subsystem == subsystem)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SignalLogger {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl fmt::Display for SignalLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "[{}] {}: {}", entry.level, entry.subsystem, entry.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_level() {
        let config = LogConfig {
            level: LogLevel::Info,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.trace("DECODE", "trace message");
        logger.debug("DECODE", "debug message");
        logger.info("DECODE", "info message");
        logger.warn("DECODE", "warn message");

        assert_eq!(logger.entries().len(), 2);
    }

    #[test]
    fn filters_by_subsystem() {
        let config = LogConfig {
            level: LogLevel::Debug,
            enable_audio: false,
            enable_gpio: true,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.info("AUDIO", "ring buffer wrote chunk");
        logger.info("GPIO", "pin 17 activated");

        assert_eq!(logger.entries().len(), 1);
        assert_eq!(logger.entries()[0].subsystem, "GPIO");
    }

    #[test]
    fn respects_max_entries() {
        let config = LogConfig {
            level: LogLevel::Debug,
            max_entries: 3,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.info("MONITOR", "message 1");
        logger.info("MONITOR", "message 2");
        logger.info("MONITOR", "message 3");
        logger.info("MONITOR", "message 4");

        assert_eq!(logger.entries().len(), 3);
        assert!(logger.entries()[0].message.contains("message 2"));
    }
}
