//! Logging initialization for the worddown binary.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// `--log-file` value that sends the log to the terminal instead of a file.
pub const TERMINAL_LOG: &str = "-";

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the given file, truncating it.
    File(PathBuf),
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both the file and the terminal.
    Both(PathBuf),
}

/// Pick the destination and level from the command line flags.
pub fn destination(log_file: &Path, verbose: bool) -> (LogDestination, LevelFilter) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = if log_file == Path::new(TERMINAL_LOG) {
        LogDestination::Terminal
    } else if verbose {
        LogDestination::Both(log_file.to_path_buf())
    } else {
        LogDestination::File(log_file.to_path_buf())
    };
    (destination, level)
}

/// Initialize the global logger. A log file that cannot be created is reported
/// on stderr and skipped.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => match create_file_logger(&path, level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![terminal_logger(level, config)],
        LogDestination::Both(path) => {
            let mut loggers: Vec<Box<dyn SharedLogger>> =
                vec![terminal_logger(level, config.clone())];
            if let Some(file_logger) = create_file_logger(&path, level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<TermLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn dash_logs_to_the_terminal() {
        assert_eq!(
            destination(Path::new("-"), false),
            (LogDestination::Terminal, LevelFilter::Info)
        );
        assert_eq!(
            destination(Path::new("-"), true),
            (LogDestination::Terminal, LevelFilter::Debug)
        );
    }

    #[test]
    fn verbose_mirrors_the_file_to_the_terminal() {
        let path = PathBuf::from("worddown.log");
        assert_eq!(
            destination(&path, false),
            (LogDestination::File(path.clone()), LevelFilter::Info)
        );
        assert_eq!(
            destination(&path, true),
            (LogDestination::Both(path), LevelFilter::Debug)
        );
    }
}
