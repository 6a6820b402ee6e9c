//! Logging setup: a console appender plus a rolling file appender, both
//! using the same pattern encoder.

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const PATTERN: &str = "{l} - {d(%Y-%m-%d %H:%M:%S)} - {m}{n}";

/// Initializes the global logger. Safe to call once at process start; a
/// second call (e.g. in tests) is tolerated and logged at debug level.
pub fn init(log_file: Option<&str>, level: LevelFilter) {
    let console = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(PATTERN))).build();

    let mut builder = Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(path) = log_file {
        match FileAppender::builder().encoder(Box::new(PatternEncoder::new(PATTERN))).build(path) {
            Ok(file) => {
                builder = builder.appender(Appender::builder().build("file", Box::new(file)));
                root = root.appender("file");
            }
            Err(err) => {
                eprintln!("logging: could not open log file {path}: {err}");
            }
        }
    }

    let config = match builder.build(root.build(level)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("logging: invalid configuration: {err}");
            return;
        }
    };

    if log4rs::init_config(config).is_err() {
        log::debug!("logging: logger already initialized");
    }
}
