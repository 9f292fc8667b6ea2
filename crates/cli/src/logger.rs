//! Stderr logger for the radial CLI.
//!
//! Stdout carries JSON results, so every log line goes to stderr.

use anyhow::Result;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::io::{self, Write};

pub struct CliLogger {
    level: LevelFilter,
}

impl CliLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Maps `-v` repetitions to a level filter.
    pub fn level_for(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Install the logger with the specified log level
    pub fn init(level: LevelFilter) -> Result<()> {
        log::set_boxed_logger(Box::new(Self::new(level)))
            .map(|()| log::set_max_level(level))
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;

        log::debug!("logger initialized at {}", level);
        Ok(())
    }

    fn format(&self, record: &Record) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "{} {} [{}] {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = self.format(record);
            // A closed stderr is not worth failing the run over
            let _ = writeln!(io::stderr().lock(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(CliLogger::level_for(0), LevelFilter::Warn);
        assert_eq!(CliLogger::level_for(1), LevelFilter::Info);
        assert_eq!(CliLogger::level_for(2), LevelFilter::Debug);
        assert_eq!(CliLogger::level_for(9), LevelFilter::Trace);
    }

    #[test]
    fn test_enabled_respects_level() {
        let logger = CliLogger::new(LevelFilter::Info);
        let info = Metadata::builder().level(Level::Info).build();
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(logger.enabled(&info));
        assert!(!logger.enabled(&debug));
    }

    #[test]
    fn test_line_format() {
        let logger = CliLogger::new(LevelFilter::Trace);
        let line = logger.format(
            &Record::builder()
                .args(format_args!("hello"))
                .level(Level::Warn)
                .target("radial")
                .build(),
        );
        assert!(line.ends_with("WARN [radial] hello"));
    }
}
