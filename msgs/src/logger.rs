use tracing_subscriber::{fmt, EnvFilter};

/// Installs the process-wide fmt subscriber. Only binaries call this.
///
/// `RUST_LOG` wins over `default_filter`. A second call is ignored.
pub fn init_logger(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
