use std::{env, io::Write, sync::Once};

use chrono::Local;
use env_logger::{fmt::Formatter, Builder as EnvLoggerBuilder};
use log::{LevelFilter, Record};

use crate::errors::error::{TestUtilsError, TestUtilsResult};

static TEST_LOGGING_INIT: Once = Once::new();

/// Installs the test logger once per process when `RUST_LOG` is set.
pub fn init_logger() {
    TEST_LOGGING_INIT.call_once(|| {
        if let Ok(pattern) = env::var("RUST_LOG") {
            if let Err(err) = TestLogger::init(&pattern) {
                eprintln!("{}", err);
            }
        }
    });
}

#[derive(Debug)]
pub struct TestLogger;

fn text_format(buf: &mut Formatter, record: &Record<'_>) -> std::io::Result<()> {
    let level = buf.default_level_style(record.level());
    writeln!(
        buf,
        "{}|{level}{:>5}{level:#}|{:<30}|{:>35}:{:<4}| {}",
        Local::now().format("%H:%M:%S%.3f"),
        record.level(),
        record.target(),
        record.file().unwrap_or_default(),
        record.line().unwrap_or_default(),
        record.args()
    )
}

impl TestLogger {
    pub fn init(pattern: &str) -> TestUtilsResult<()> {
        EnvLoggerBuilder::new()
            .format(text_format)
            .filter(None, LevelFilter::Off)
            .parse_filters(pattern)
            .is_test(true)
            .try_init()
            .map_err(|err| TestUtilsError::LoggingError(format!("Cannot init logger: {:?}", err)))
    }
}
