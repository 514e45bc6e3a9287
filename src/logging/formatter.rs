use std::io::{self, Stdout};

use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use super::config::{ConsoleConfig, LogFormat};

/// Опции fmt-слоя, общие для консоли и файла.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FmtOptions {
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

impl From<&ConsoleConfig> for FmtOptions {
    fn from(c: &ConsoleConfig) -> Self {
        Self {
            format: c.format,
            with_ansi: c.with_ansi,
            with_target: c.with_target,
            with_thread_ids: c.with_thread_ids,
            with_line_numbers: c.with_line_numbers,
        }
    }
}

/// Слой вывода в stdout.
pub(crate) fn console_layer<S>(config: &ConsoleConfig) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    // Явно указываем writer как fn() -> Stdout
    let writer: fn() -> Stdout = io::stdout;
    build_layer(FmtOptions::from(config), writer)
}

/// Строит fmt-слой для произвольного writer-а.
///
/// Возвращаем boxed trait-объект, чтобы стереть конкретный тип формата
/// (json/pretty/compact).
pub(crate) fn build_layer<S, W>(
    opts: FmtOptions,
    writer: W,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match opts.format {
        LogFormat::Json => fmt::layer()
            .event_format(fmt::format().json().with_current_span(true))
            .fmt_fields(fmt::format::JsonFields::new())
            .with_writer(writer)
            .with_ansi(false)
            .with_target(opts.with_target)
            .with_thread_ids(opts.with_thread_ids)
            .with_line_number(opts.with_line_numbers)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .event_format(fmt::format().pretty())
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(writer)
            .with_ansi(opts.with_ansi)
            .with_target(opts.with_target)
            .with_thread_ids(opts.with_thread_ids)
            .with_line_number(opts.with_line_numbers)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .event_format(fmt::format().compact())
            .with_writer(writer)
            .with_ansi(opts.with_ansi)
            .with_target(opts.with_target)
            .with_thread_ids(opts.with_thread_ids)
            .with_line_number(opts.with_line_numbers)
            .boxed(),
    }
}
