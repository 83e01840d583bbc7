use color_eyre::Result;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

pub fn init_errors() -> Result<()> {
    color_eyre::install()
}

/// `RUST_LOG` wins over `verbose` when set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbose).with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}
