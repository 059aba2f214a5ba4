// DANS : src/monitoring/logging.rs
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installe le subscriber global. À appeler une seule fois, au démarrage du binaire.
pub fn setup_logging(json: bool) {
    // RUST_LOG, "info" par défaut.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
