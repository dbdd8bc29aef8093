use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{stderr, Write};
use std::sync::{Mutex, Once};

/// Log implementation writing prefixed lines to standard error
///
/// Standard output is reserved for the results table, so every log line goes to standard error.
pub struct StdLogger(Mutex<()>);

impl StdLogger {
    /// Initialize logger
    ///
    /// Each `-v` on the command line raises the level by one step, starting from warnings.
    ///
    /// Even if this function is called multiple times, initialization will only be done once. If
    /// another logger has already been installed, that logger is kept.
    pub fn init(verbosity: u64) {
        static INIT: Once = Once::new();

        INIT.call_once(|| {
            if log::set_boxed_logger(Box::new(StdLogger(Mutex::new(())))).is_ok() {
                log::set_max_level(Self::level_for(verbosity));
            }
        });
    }

    /// Map the number of `-v` flags to a level filter
    pub fn level_for(verbosity: u64) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn prefix(level: Level) -> &'static str {
        match level {
            Level::Error | Level::Warn => "[-]",
            Level::Info => "[i]",
            Level::Debug | Level::Trace => "[+]",
        }
    }
}

impl Log for StdLogger {
    /// Filtering is left to the global max level
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        // Keep lines from interleaving
        let _guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stderr = stderr();
        let mut handle = stderr.lock();
        let _ = writeln!(handle, "{} {}", Self::prefix(record.level()), record.args());
    }

    fn flush(&self) {
        let _ = stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_init() {
        // Init logger, twice
        StdLogger::init(3);
        StdLogger::init(0);

        // Call different log implementations
        trace!("trace log succeeded");
        debug!("debug log succeeded");
        info!("info log succeeded");
        warn!("warn log succeeded");
        error!("error log succeeded");
    }

    #[test]
    fn logger_enabled() {
        use log::{logger, Metadata};

        // Init logger first...
        StdLogger::init(1);

        // ... then get reference to it
        let logger = logger();
        let meta = Metadata::builder().build();

        // Assert that it is active
        assert!(logger.enabled(&meta));
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(StdLogger::level_for(0), LevelFilter::Warn);
        assert_eq!(StdLogger::level_for(1), LevelFilter::Info);
        assert_eq!(StdLogger::level_for(2), LevelFilter::Debug);
        assert_eq!(StdLogger::level_for(9), LevelFilter::Trace);
    }

    #[test]
    fn prefixes() {
        assert_eq!(StdLogger::prefix(Level::Error), "[-]");
        assert_eq!(StdLogger::prefix(Level::Info), "[i]");
        assert_eq!(StdLogger::prefix(Level::Trace), "[+]");
    }
}
