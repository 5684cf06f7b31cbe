use crate::prelude::Result;
use tracing::subscriber::set_global_default;
use tracing::{Level, Subscriber};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt::MakeWriter};

/// Composes a tracing subscriber for the REST core and its callers.
///
/// # Arguments
///
/// * `max_level`: Default maximum level if `RUST_LOG` is not set.
/// * `json`: Emit JSON lines instead of the compact human format.
/// * `sink`: Destination where logs will be written to.
///
pub fn get_subscriber<Sink>(
    max_level: Level,
    json: bool,
    sink: Sink,
) -> Box<dyn Subscriber + Sync + Send>
where
    Sink: for<'a> MakeWriter<'a> + Sync + Send + 'static,
{
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_error| EnvFilter::new(max_level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(sink);

    if json {
        Box::new(builder.json().with_current_span(true).finish())
    } else {
        Box::new(builder.compact().finish())
    }
}

/// Register a subscriber as global default.
///
/// # Warning
///
/// Call this **once** per process; a second call returns
/// `Error::Telemetry`.
///
pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send + 'static) -> Result<()> {
    // Route `log` records emitted by dependencies into tracing.
    LogTracer::init()?;

    set_global_default(subscriber)?;
    Ok(())
}
