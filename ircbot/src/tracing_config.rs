use crate::config::*;
use tracing::Subscriber;
use tracing_core::LevelFilter;
use tracing_subscriber::{filter::filter_fn, prelude::*, registry::LookupSpan, Layer};

use std::path::Path;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

fn build_target<S>(conf: LogEntry, dir: impl AsRef<Path>) -> BoxedLayer<S>
where
    S: Subscriber + Send + Sync,
    for<'span> S: LookupSpan<'span>,
{
    let layer = match &conf.target {
        LogTarget::File { filename } => tracing_subscriber::fmt::layer()
            .with_writer(tracing_appender::rolling::daily(dir, filename))
            .with_ansi(false)
            .boxed(),
        LogTarget::Builtin(BuiltinLogTarget::Stdout) => {
            tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
        }
        LogTarget::Builtin(BuiltinLogTarget::Stderr) => {
            tracing_subscriber::fmt::layer().with_writer(std::io::stderr).boxed()
        }
    };

    let level: LevelFilter = conf.level.map(Into::into).unwrap_or(LevelFilter::TRACE);
    let modules = conf.modules;

    let filter = filter_fn(move |metadata| {
        metadata.level() <= &level
            && (modules.is_empty()
                || match metadata.module_path() {
                    Some(module) => modules.iter().any(|m| module.starts_with(m.as_str())),
                    None => true,
                })
    });

    layer.with_filter(filter).boxed()
}

/// Build the process-wide subscriber described by the `log` config section
pub fn build_subscriber(conf: LoggingConfig) -> impl Subscriber
{
    let layers: Vec<_> = conf
        .targets
        .into_iter()
        .map(|target| build_target(target, &conf.dir))
        .collect();

    // The global filter only trims noisy modules; its default has to be
    // permissive so that each target can do its own filtering
    let filter = tracing_subscriber::filter::Targets::new()
        .with_default(conf.default_level.unwrap_or(LogLevel::Trace))
        .with_targets(conf.module_levels);

    tracing_subscriber::registry().with(filter).with(layers)
}
