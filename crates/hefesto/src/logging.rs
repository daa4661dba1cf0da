use std::{
    fmt::Display,
    io::{self, Write},
};

use nu_ansi_term::Color::{self, Blue, Magenta, Red, Yellow};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
};

use crate::{
    config::Config,
    error::{HefestoError, Result},
};

/// Targets of the workspace crates, filtered together.
const TARGETS: [&str; 3] = ["hefesto", "hefesto_criteria", "hefesto_hql"];

struct Colored<T: Display>(Color, T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.prefix())?;
        self.1.fmt(f)?;
        write!(f, "{}", self.0.suffix())
    }
}

/// Message of one event followed by its other fields as `key=value`.
#[derive(Debug, Default, PartialEq)]
struct EventLine {
    message: String,
    fields: Vec<String>,
}

impl EventLine {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}

impl Visit for EventLine {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

impl Display for EventLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        let mut separate = !self.message.is_empty();
        for field in &self.fields {
            if separate {
                f.write_str(" ")?;
            }
            f.write_str(field)?;
            separate = true;
        }
        Ok(())
    }
}

/// Tag printed before events of `level`; info lines are printed bare.
fn level_tag(level: Level) -> Option<Colored<&'static str>> {
    let (color, tag) = match level {
        Level::INFO => return None,
        Level::TRACE => (Magenta, "trace:"),
        Level::DEBUG => (Blue, "debug:"),
        Level::WARN => (Yellow, "warn:"),
        Level::ERROR => (Red, "error:"),
    };
    Some(Colored(color, tag))
}

/// Compact line format: an optional level tag, the message, then structured fields.
pub struct QueryLogFormat;

impl<S, N> FormatEvent<S, N> for QueryLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, _: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> std::fmt::Result {
        let mut line = EventLine::default();
        event.record(&mut line);

        if let Some(tag) = level_tag(*event.metadata().level()) {
            write!(writer, "{tag} ")?;
        }
        writeln!(writer, "{line}")
    }
}

/// Info events go to stdout, everything else to stderr.
struct LevelWriter;

enum StdWriter {
    Out(io::Stdout),
    Err(io::Stderr),
}

impl Write for StdWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StdWriter::Out(out) => out.write(buf),
            StdWriter::Err(err) => err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StdWriter::Out(out) => out.flush(),
            StdWriter::Err(err) => err.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LevelWriter {
    type Writer = StdWriter;

    fn make_writer(&'a self) -> Self::Writer {
        StdWriter::Out(io::stdout())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        if meta.level() == &Level::INFO {
            StdWriter::Out(io::stdout())
        } else {
            StdWriter::Err(io::stderr())
        }
    }
}

/// Filter directive enabling `level` for every workspace crate.
pub fn filter_directive(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global tracing subscriber described by `config`.
pub fn setup_logging(config: &Config) -> Result<()> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter_directive(config.log_level()))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(LevelWriter)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if config.log_json() {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(QueryLogFormat).finish())
    };

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| HefestoError::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_covers_all_crates() {
        assert_eq!(
            filter_directive("debug"),
            "hefesto=debug,hefesto_criteria=debug,hefesto_hql=debug"
        );
    }

    #[test]
    fn test_event_line_appends_fields() {
        let line = EventLine {
            message: "query translated".into(),
            fields: vec!["params=2".into(), "mode=Count".into()],
        };
        assert_eq!(line.to_string(), "query translated params=2 mode=Count");

        let bare = EventLine {
            message: String::new(),
            fields: vec!["rows=3".into()],
        };
        assert_eq!(bare.to_string(), "rows=3");
    }

    #[test]
    fn test_info_has_no_tag() {
        assert!(level_tag(Level::INFO).is_none());
        let tag = level_tag(Level::WARN).map(|tag| tag.1);
        assert_eq!(tag, Some("warn:"));
    }

    #[test]
    fn test_second_setup_reports_error() {
        let config = Config::default_config();
        let first = setup_logging(&config);
        let second = setup_logging(&config);
        assert!(first.is_ok() || matches!(first, Err(HefestoError::Logging(_))));
        assert!(matches!(second, Err(HefestoError::Logging(_))));
    }
}
