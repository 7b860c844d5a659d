use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the stderr subscriber. `RUST_LOG` wins when set; otherwise the
/// crate logs at info, or debug when `verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "splitannot=debug" } else { "splitannot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A second call (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}
