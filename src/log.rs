//! Logging module for terminal based output control.
//!
//! Contains a custom logging implementation to disable/redirect output
//! based on command line switches baked into the application level.
use clap::ArgMatches;
use logger::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::cli;

/// Basic logger instance to allow quiet-aware logging.
struct BasicLogger {
    quiet: bool,
}

// Basic logging implementation.
impl Log for BasicLogger {
    /// Returns enabled only for s3-ilm modules.
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("s3_ilm")
    }

    /// Logs out a `Record` when logging is enabled.
    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            match record.metadata().level() {
                Level::Error => eprintln!("{}", record.args()),
                Level::Warn => eprintln!("warning: {}", record.args()),
                _ if !self.quiet => println!("{}", record.args()),
                _ => (),
            }
        }
    }

    /// Flushes this logger.
    fn flush(&self) {}
}

/// Determines the maximum level to log at.
fn level(quiet: bool, verbose: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Warn,
        (false, true) => LevelFilter::Debug,
        (false, false) => LevelFilter::Info,
    }
}

/// Determines the `(quiet, verbose)` switches from the top level matches.
///
/// Commands writing JSON are always quiet, so that stdout only ever
/// carries the JSON document.
fn switches(args: &ArgMatches) -> (bool, bool) {
    let active = cli::active_args(args);
    let quiet = active.is_present("quiet") || cli::writes_json(args);
    (quiet, active.is_present("verbose"))
}

/// Initializes the logger based on the provided arguments.
///
/// If the `-q` flag was provided, this short circuits to cull all logging
/// beyond warnings and errors; `-v` enables debug logging.
pub fn init(args: &ArgMatches) -> Result<(), SetLoggerError> {
    let (quiet, verbose) = switches(args);

    let logger = Box::new(BasicLogger { quiet });
    log::set_boxed_logger(logger).map(|_| log::set_max_level(level(quiet, verbose)))
}
