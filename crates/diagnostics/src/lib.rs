//! Logging setup shared by the confnav crates
//!
//! Usage:
//! - Set CONFNAV_LOG=off (default) - no logs
//! - Set CONFNAV_LOG=info - connections, commits, reloads
//! - Set CONFNAV_LOG=debug - cache traffic and schema fallbacks
//!
//! Library code logs through the short macros after `use diagnostics::*;`.

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable read by [`init_diagnostics`]
pub const LOG_ENV: &str = "CONFNAV_LOG";

static INIT: Once = Once::new();

/// Parse a CONFNAV_LOG value.
///
/// `None` means logging stays off. Unknown values fall back to info and are
/// reported back as the second element.
#[must_use]
pub fn parse_level(value: &str) -> (Option<emit::Level>, bool) {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => (None, true),
        "debug" => (Some(emit::Level::Debug), true),
        "info" => (Some(emit::Level::Info), true),
        "warn" => (Some(emit::Level::Warn), true),
        "error" => (Some(emit::Level::Error), true),
        _ => (Some(emit::Level::Info), false),
    }
}

/// Initialize diagnostics based on the CONFNAV_LOG environment variable
///
/// Safe to call more than once; only the first call has any effect.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let requested = std::env::var(LOG_ENV).unwrap_or_default();
        let (level, recognized) = parse_level(&requested);
        let Some(level) = level else {
            return;
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();
        if !recognized {
            emit::warn!(
                "Unknown {env} value {requested}, using info",
                env: LOG_ENV,
                requested: requested.as_str()
            );
        }

        // The runtime lives for the rest of the process.
        std::mem::forget(rt);
    });
}

/// Log operations a user would want to see in normal usage.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics: cache hits, lookups, internal state.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that stop an operation.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
