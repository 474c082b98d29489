//! Diagnostic logging to stderr, configured once at startup from
//! `LOG_LEVEL` and `LOG_FORMAT`.

use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

pub const LEVEL_ENV: &str = "LOG_LEVEL";
pub const FORMAT_ENV: &str = "LOG_FORMAT";
pub const DEFAULT_LEVEL: i64 = 30;
pub const DEFAULT_TEMPLATE: &str = "{level}: [{target}] {message}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Level,
    Target,
    Message,
}

/// Event formatter driven by a template with `{level}`, `{target}` and
/// `{message}` placeholders. The `%(levelname)s`, `%(name)s` and
/// `%(message)s` spellings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFormat {
    pieces: Vec<Piece>,
}

impl TemplateFormat {
    pub fn parse(template: &str) -> Self {
        let template = template
            .replace("%(levelname)s", "{level}")
            .replace("%(name)s", "{target}")
            .replace("%(message)s", "{message}");

        let mut pieces = Vec::new();
        let mut rest = template.as_str();
        while !rest.is_empty() {
            let next = [("{level}", Piece::Level), ("{target}", Piece::Target), ("{message}", Piece::Message)]
                .into_iter()
                .filter_map(|(token, piece)| rest.find(token).map(|pos| (pos, token, piece)))
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, token, piece)) => {
                    if pos > 0 {
                        pieces.push(Piece::Literal(rest[..pos].to_string()));
                    }
                    pieces.push(piece);
                    rest = &rest[pos + token.len()..];
                }
                None => {
                    pieces.push(Piece::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        Self { pieces }
    }
}

impl Default for TemplateFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE)
    }
}

impl<S, N> FormatEvent<S, N> for TemplateFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => writer.write_str(text)?,
                Piece::Level => write!(writer, "{}", metadata.level())?,
                Piece::Target => writer.write_str(metadata.target())?,
                Piece::Message => ctx.field_format().format_fields(writer.by_ref(), event)?,
            }
        }
        writeln!(writer)
    }
}

/// Maps a numeric level (10 debug, 20 info, 30 warning, 40 error) to a
/// filter. Values below 10 enable tracing.
pub fn level_from_number(level: i64) -> LevelFilter {
    match level {
        i64::MIN..=9 => LevelFilter::TRACE,
        10..=19 => LevelFilter::DEBUG,
        20..=29 => LevelFilter::INFO,
        30..=39 => LevelFilter::WARN,
        _ => LevelFilter::ERROR,
    }
}

/// Builds the filter for a `LOG_LEVEL` value. Non-numeric values are read
/// as filter directives such as `flagprobe::harness=debug`.
pub fn filter_from_level(level: Option<&str>) -> EnvFilter {
    let default = || EnvFilter::new(level_from_number(DEFAULT_LEVEL).to_string());
    match level.map(str::trim) {
        None | Some("") => default(),
        Some(value) => match value.parse::<i64>() {
            Ok(number) => EnvFilter::new(level_from_number(number).to_string()),
            Err(_) => EnvFilter::try_new(value).unwrap_or_else(|_| default()),
        },
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init() {
    let level = std::env::var(LEVEL_ENV).ok();
    let template = std::env::var(FORMAT_ENV).ok();

    let format = template
        .as_deref()
        .map(TemplateFormat::parse)
        .unwrap_or_default();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_level(level.as_deref()))
        .with_writer(std::io::stderr)
        .event_format(format)
        .try_init();
}
