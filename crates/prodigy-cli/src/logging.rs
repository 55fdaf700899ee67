//! Stderr logging through `tracing-subscriber`.
//!
//! `-v` / `-vv` pick the level explicitly; without them `RUST_LOG` is
//! honoured and the default is `warn`.

use tracing_subscriber::EnvFilter;

const CRATE_TARGETS: &[&str] = &["math_prodigy", "prodigy_engine", "prodigy_contracts"];

/// Filter directive for a `-v` count.
pub fn filter_directive(verbosity: u8) -> String {
    match verbosity {
        0 => "warn".to_string(),
        1 => std::iter::once("warn".to_string())
            .chain(CRATE_TARGETS.iter().map(|target| format!("{target}=debug")))
            .collect::<Vec<String>>()
            .join(","),
        _ => "trace".to_string(),
    }
}

pub fn init_logging(verbosity: u8) {
    let directive = filter_directive(verbosity);
    let filter = if verbosity == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive))
    } else {
        EnvFilter::new(&directive)
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity > 0)
        .with_writer(std::io::stderr)
        .try_init();
}
