use log::{error, info, LevelFilter};
use std::path::Path;

// For file-based logging with rotation
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Environment variable overriding the file logger's level
pub const LOG_ENV_VAR: &str = "THUMBNAILER_LOG";

/// Initialize a rolling file logger with timestamp, log level, and module path
pub fn init_logger<P: AsRef<Path>>(
    log_dir: P,
    level: LevelFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)?;

    let log_file_path = log_dir.join("thumbnailer.log");
    let archived_logs_pattern = format!("{}/thumbnailer.{{}}.log", log_dir.display());

    // Rotate at 10MB, keep 5 archives
    let file_trigger = SizeTrigger::new(10 * 1024 * 1024);
    let file_roller = FixedWindowRoller::builder()
        .build(&archived_logs_pattern, 5)
        .map_err(|e| format!("Failed to create log roller: {}", e))?;
    let compound_policy = CompoundPolicy::new(Box::new(file_trigger), Box::new(file_roller));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{M}:{L}] - {m}{n}",
        )))
        .build(&log_file_path, Box::new(compound_policy))
        .map_err(|e| format!("Failed to create log appender: {}", e))?;

    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(level);

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(rolling_file)))
        .build(Root::builder().appender("file").build(level))
        .map_err(|e| format!("Failed to build log config: {}", e))?;

    log4rs::init_config(config).map_err(|e| format!("Failed to initialize log4rs: {}", e))?;

    info!("Thumbnailer started");
    info!("Logging to file: {}", log_file_path.display());
    Ok(())
}

/// Log an I/O or codec failure against the file it concerns
pub fn log_file_error(path: &Path, operation: &str, error: &dyn std::error::Error) {
    error!("{} failed for '{}': {}", operation, path.display(), error);
}

/// Log a file or directory the thumbnailer created or replaced
pub fn log_fs_modification(operation: &str, path: &Path, details: Option<&str>) {
    match details {
        Some(details) if !details.is_empty() => {
            info!("{} '{}' ({})", operation, path.display(), details)
        }
        _ => info!("{} '{}'", operation, path.display()),
    }
}
