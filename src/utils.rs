/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `info` when the variable is not set.
#[cfg(feature = "logging")]
pub fn init_logging() -> Result<(), crate::Error> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| crate::Error::Logging(e.to_string()))
}
