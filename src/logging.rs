use log::{Metadata, Record};

pub(crate) use log::{debug, error, info, trace, warn};

/// Set the callback function that is called when logging.
///
/// The `callback` function's first parameter is the level of the message being
/// logged, and the second is the message itself.
pub fn set_logging_callback<T>(callback: T)
where
    T: Fn(LogLevel, &str) + Send + Sync + 'static,
{
    // FIXME: set_boxed_logger can only be called once, and it's not possible to retrieve and downcast the logger from log once set.
    let logger = Box::new(CallbackLogger { callback });

    log::set_boxed_logger(logger)
        .map(|_| log::set_max_level(log::LevelFilter::Trace))
        .unwrap();
}

/// Set the minimum level of messages passed to the logging callback.
pub fn set_log_level(level: LogLevel) {
    log::set_max_level(level.into());
}

pub(crate) fn is_log_enabled(level: LogLevel) -> bool {
    log::LevelFilter::from(level) <= log::max_level()
}

/// Formats an error together with its full source chain, for use in log
/// messages where the top-level `Display` text alone would drop context that
/// callers can't otherwise recover.
pub(crate) fn format_details(error: &(dyn std::error::Error + 'static)) -> String {
    use std::fmt::Write;

    let mut message = error.to_string();

    let mut source = error.source();
    while let Some(e) = source {
        write!(message, ": {e}").unwrap();
        source = e.source();
    }

    message
}

/// Codes used to specify different levels of API logging.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Fatal => write!(f, "fatal"),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Trace => LogLevel::Trace,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Info => LogLevel::Info,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Error => LogLevel::Error,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error | LogLevel::Fatal => log::LevelFilter::Error,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct CallbackLogger<T: Fn(LogLevel, &str)> {
    callback: T,
}

impl<T: Fn(LogLevel, &str) + Send + Sync> log::Log for CallbackLogger<T> {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            (self.callback)(record.level().into(), &format!("{}", record.args()));
        }
    }

    fn flush(&self) {}
}
