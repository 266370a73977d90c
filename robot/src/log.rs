// robot/src/log.rs
use std::path::Path;

use simple_log::LogConfigBuilder;

use crate::error::{RobotError, RobotResult};

const LOG_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Журнал событий в файл (с ротацией) и на консоль
pub fn init(log_file: &Path, level: &str) -> RobotResult<()> {
    let config = LogConfigBuilder::builder()
        .path(log_file.to_string_lossy().into_owned())
        .size(10)
        .roll_count(5)
        .time_format(LOG_TIME_FORMAT)
        .level(level)
        .output_file()
        .output_console()
        .build();

    simple_log::new(config).map_err(|e| RobotError::Logger(format!("Log init failed: {}", e)))?;
    Ok(())
}
