//! Compact tracing formatter for buffer diagnostics.

use std::fmt;
use time::macros::format_description;
use time::{format_description::FormatItem, OffsetDateTime};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second].[subsecond digits:4]");

/// Formats events as `HH:MM:SS.ffff LEVEL span{fields}: target: fields`.
///
/// Timestamps can be turned off for output that is diffed or captured.
#[derive(Debug, Clone, Copy)]
pub struct LogFormatter {
    timestamps: bool,
}

impl LogFormatter {
    pub fn new() -> Self {
        Self { timestamps: true }
    }

    pub fn without_timestamps() -> Self {
        Self { timestamps: false }
    }
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for LogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let meta = event.metadata();

        if self.timestamps {
            let formatted_time = OffsetDateTime::now_utc().format(&TIMESTAMP_FORMAT).map_err(|e| {
                eprintln!("Failed to format timestamp: {}", e);
                fmt::Error
            })?;
            paint(&mut writer, "2", formatted_time)?;
            writer.write_char(' ')?;
        }

        let (color, label) = level_style(meta.level());
        paint(&mut writer, color, label)?;
        writer.write_char(' ')?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                paint(&mut writer, "1", span.metadata().name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
                writer.write_str(": ")?;
            }
        }

        paint(&mut writer, "2", meta.target())?;
        writer.write_str(": ")?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// ANSI SGR code and right-aligned label for a level.
fn level_style(level: &Level) -> (&'static str, &'static str) {
    match *level {
        Level::TRACE => ("35", "TRACE"),
        Level::DEBUG => ("34", "DEBUG"),
        Level::INFO => ("32", " INFO"),
        Level::WARN => ("33", " WARN"),
        Level::ERROR => ("31", "ERROR"),
    }
}

fn paint(writer: &mut Writer<'_>, sgr: &str, s: impl fmt::Display) -> fmt::Result {
    if writer.has_ansi_escapes() {
        write!(writer, "\x1b[{}m{}\x1b[0m", sgr, s)
    } else {
        write!(writer, "{}", s)
    }
}
