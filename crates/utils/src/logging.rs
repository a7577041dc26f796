use tracing_subscriber::{EnvFilter, prelude::*};

const CRATES: &[&str] = &["server", "services", "deployment", "local_deployment", "utils"];

/// Build the filter directive string: dependencies at `warn`, our crates at `level`.
pub fn filter_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for krate in CRATES {
        directives.push_str(&format!(",{krate}={level}"));
    }
    directives
}

/// Install the global tracing subscriber. The level comes from `RUST_LOG`
/// (a bare level such as `debug`), defaulting to `info`.
pub fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(filter_directives(&log_level)).unwrap_or_else(|e| {
        eprintln!("Invalid RUST_LOG value '{log_level}' ({e}), falling back to info");
        EnvFilter::new(filter_directives("info"))
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();
}
