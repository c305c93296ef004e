// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup.
//!
//! Proctor logs through [`tracing`]. Embedders that don't install a subscriber of their own can
//! call [`init_logging`], which writes events to standard error, filtered by the `PROCTOR_LOG`
//! environment variable.

use std::{fmt, sync::Once};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::{ParseError, Targets},
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable holding the log filter, for example `proctor_runner=debug`.
pub const LOG_ENV: &str = "PROCTOR_LOG";

static INIT_LOGGER: Once = Once::new();

/// Installs a global subscriber that writes events to standard error.
///
/// Events are filtered with the [`Targets`] directives in `PROCTOR_LOG`, defaulting to `info`.
/// Only the first call has an effect. If another global subscriber is already installed, it is
/// left in place.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let level_str = std::env::var_os(LOG_ENV).unwrap_or_default();
        let targets = match level_str.into_string() {
            Ok(level_str) => log_filter(&level_str).unwrap_or_else(|error| {
                eprintln!("warning: ignoring invalid {LOG_ENV} `{level_str}`: {error}");
                default_filter()
            }),
            Err(_) => {
                eprintln!("warning: ignoring {LOG_ENV} because it is not valid UTF-8");
                default_filter()
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter)
            .with_writer(std::io::stderr)
            .with_filter(targets);

        // Fails if the embedder already installed a subscriber, which then takes precedence.
        let _ = tracing_subscriber::registry().with(layer).try_init();
    });
}

fn default_filter() -> Targets {
    Targets::new().with_default(LevelFilter::INFO)
}

fn log_filter(level_str: &str) -> Result<Targets, ParseError> {
    // If the level string is empty, use the standard level filter instead.
    if level_str.trim().is_empty() {
        Ok(default_filter())
    } else {
        level_str.parse()
    }
}

static MESSAGE_FIELD: &str = "message";

/// Writes `level: message key=value ...` lines.
struct SimpleFormatter;

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = match *event.metadata().level() {
            Level::ERROR => "error",
            Level::WARN => "warning",
            Level::INFO => "info",
            Level::DEBUG => "debug",
            Level::TRACE => "trace",
        };
        write!(writer, "{level}: ")?;

        let mut visitor = FieldVisitor {
            writer: &mut writer,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

struct FieldVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    error: Option<fmt::Error>,
}

impl Visit for FieldVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let result = if field.name() == MESSAGE_FIELD {
            write!(self.writer, "{value:?}")
        } else {
            write!(self.writer, " {}={value:?}", field.name())
        };
        if let Err(error) = result {
            self.error = Some(error);
        }
    }
}
