//! Console log formatting: `<unix_millis>|<LVL>|<MODULE>|k1=v1,k2=v2,...`.
//!
//! Verbosity is controlled by the `LOG_LEVEL` environment variable (not
//! `RUST_LOG`, to keep this binary's knob distinct from library crates
//! that read the latter), defaulting to `info` when unset or unparsable.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use truck_common::prelude::LogLevel;

fn level_code(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRC",
        Level::DEBUG => "DBG",
        Level::INFO => "INF",
        Level::WARN => "WRN",
        Level::ERROR => "ERR",
    }
}

#[derive(Default)]
struct KeyValueVisitor {
    module: Option<String>,
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl Visit for KeyValueVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let name = field.name();
        let rendered = format!("{value:?}");
        if name == "message" {
            self.message = Some(rendered);
        } else if name == "module" {
            self.module = Some(rendered.trim_matches('"').to_string());
        } else {
            self.fields.push((name.to_string(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let name = field.name();
        if name == "message" {
            self.message = Some(value.to_string());
        } else if name == "module" {
            self.module = Some(value.to_string());
        } else {
            self.fields.push((name.to_string(), value.to_string()));
        }
    }
}

/// Custom event formatter producing
/// `<unix_millis>|<LVL>|<MODULE>|k1=v1,k2=v2,...` lines.
pub struct CoreFormatter;

impl<S, N> FormatEvent<S, N> for CoreFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        let mut visitor = KeyValueVisitor::default();
        event.record(&mut visitor);

        let module = visitor.module.as_deref().unwrap_or("??");
        let level = level_code(event.metadata().level());

        write!(writer, "{now_ms}|{level}|{module}|")?;

        let mut first = true;
        if let Some(message) = &visitor.message {
            write!(writer, "msg={message}")?;
            first = false;
        }
        for (key, value) in &visitor.fields {
            if !first {
                write!(writer, ",")?;
            }
            write!(writer, "{key}={value}")?;
            first = false;
        }
        writeln!(writer)
    }
}

/// Build an [`EnvFilter`] from the `LOG_LEVEL` environment variable,
/// falling back to `info` when unset or unparsable.
pub fn env_filter_from_log_level() -> EnvFilter {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|raw| match raw.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        })
        .unwrap_or(LogLevel::Info);

    let directive = match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };
    EnvFilter::new(directive)
}

/// Install the process-wide tracing subscriber using [`CoreFormatter`] and
/// the `LOG_LEVEL`-derived filter. Must be called exactly once, as early
/// as possible in `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter_from_log_level())
        .event_format(CoreFormatter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_codes_are_three_characters() {
        for level in [Level::TRACE, Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR] {
            assert_eq!(level_code(&level).len(), 3);
        }
    }

    #[test]
    fn unset_log_level_falls_back_to_info() {
        std::env::remove_var("LOG_LEVEL");
        let filter = env_filter_from_log_level();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn garbage_log_level_falls_back_to_info() {
        std::env::set_var("LOG_LEVEL", "not-a-level");
        let filter = env_filter_from_log_level();
        assert_eq!(filter.to_string(), "info");
        std::env::remove_var("LOG_LEVEL");
    }

    #[test]
    fn recognized_log_level_is_honored() {
        std::env::set_var("LOG_LEVEL", "debug");
        let filter = env_filter_from_log_level();
        assert_eq!(filter.to_string(), "debug");
        std::env::remove_var("LOG_LEVEL");
    }
}
