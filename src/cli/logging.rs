//! Logging utilities for CLI output

use std::sync::atomic::{AtomicU8, Ordering};

use log::{Level, LevelFilter, Metadata, Record};

/// Level read by the installed logger on every record
static ACTIVE_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

/// Log level for CLI output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    /// Suppress all output
    Quiet,
    /// Normal output level
    Normal,
    /// Verbose output with additional details
    Verbose,
}

impl LogLevel {
    /// Level from the global `--quiet` / `--verbose` flags; quiet wins
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Quiet,
            2 => Self::Verbose,
            _ => Self::Normal,
        }
    }

    /// Most detailed library record shown at this level
    pub fn filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Error,
            Self::Normal => LevelFilter::Info,
            Self::Verbose => LevelFilter::Debug,
        }
    }
}

/// Log a message if the current level permits it
pub fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

/// Writes library records to stderr
struct CliLogger {
    level: &'static AtomicU8,
}

impl CliLogger {
    fn filter(&self) -> LevelFilter {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed)).filter()
    }
}

impl log::Log for CliLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.filter()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error | Level::Warn => {
                eprintln!("[{}] {}", record.level(), record.args());
            }
            _ => eprintln!("{}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Route `log` records from the library to stderr.
///
/// Only the first call installs a logger; later calls change the level the
/// installed logger filters on.
pub fn init_logger(level: LogLevel) {
    ACTIVE_LEVEL.store(level as u8, Ordering::Relaxed);
    // Err means a logger is already installed
    let _ = log::set_boxed_logger(Box::new(CliLogger {
        level: &ACTIVE_LEVEL,
    }));
    log::set_max_level(level.filter());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(LogLevel::from_flags(false, false), LogLevel::Normal);
        assert_eq!(LogLevel::from_flags(false, true), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
    }

    #[test]
    fn test_filters() {
        assert_eq!(LogLevel::Quiet.filter(), LevelFilter::Error);
        assert_eq!(LogLevel::Normal.filter(), LevelFilter::Info);
        assert_eq!(LogLevel::Verbose.filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_logger_respects_filter() {
        static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);
        let logger = CliLogger { level: &LEVEL };
        let info = Metadata::builder().level(Level::Info).build();
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(log::Log::enabled(&logger, &info));
        assert!(!log::Log::enabled(&logger, &debug));
    }

    #[test]
    fn test_logger_follows_level_changes() {
        static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Quiet as u8);
        let logger = CliLogger { level: &LEVEL };
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(!log::Log::enabled(&logger, &debug));

        LEVEL.store(LogLevel::Verbose as u8, Ordering::Relaxed);
        assert!(log::Log::enabled(&logger, &debug));
    }
}
