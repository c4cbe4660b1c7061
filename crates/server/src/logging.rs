#![forbid(unsafe_code)]

//! Tracing subscriber setup. `RUST_LOG` selects levels; the default keeps the
//! server and storage crates at info.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "qc_server=info,qc_storage=info";

/// Installs the global subscriber, writing to stderr. Later calls are no-ops.
pub fn init(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    if json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }

    #[test]
    fn default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert!(format!("{filter:?}").contains("qc_server"));
    }
}
