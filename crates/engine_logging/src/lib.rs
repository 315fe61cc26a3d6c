#![deny(missing_docs)]
//! Shared logging utilities for the engine workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a thread-local export context that tags every engine log line with the batch
//! it belongs to, and a minimal test initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Identifier of the export batch the current thread is working on.
    static EXPORT_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Binds an export batch id to the current thread.
/// Pass `None` to log without a batch prefix.
pub fn set_export_context(export_id: Option<&str>) {
    EXPORT_CONTEXT.with(|ctx| *ctx.borrow_mut() = export_id.map(str::to_owned));
}

/// Removes any export batch id bound to the current thread.
pub fn clear_export_context() {
    set_export_context(None);
}

/// Returns the export batch id bound to the current thread, if any.
pub fn export_context() -> Option<String> {
    EXPORT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Returns the prefix the logging macros put in front of each message.
/// Empty when no export context is set.
#[doc(hidden)]
pub fn context_prefix() -> String {
    EXPORT_CONTEXT.with(|ctx| match ctx.borrow().as_deref() {
        Some(id) => format!("[{id}] "),
        None => String::new(),
    })
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_follows_context() {
        clear_export_context();
        assert_eq!(context_prefix(), "");

        set_export_context(Some("export_1"));
        assert_eq!(export_context().as_deref(), Some("export_1"));
        assert_eq!(context_prefix(), "[export_1] ");

        clear_export_context();
        assert_eq!(export_context(), None);
    }
}
