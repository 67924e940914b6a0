//! Logging bootstrap for examples and ad-hoc debugging.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber when `RUST_LOG` is set.
///
/// Does nothing when the variable is unset, and loses quietly to any
/// subscriber installed earlier in the process. A `RUST_LOG` value that
/// fails to parse as a filter falls back to debug output for this crate's
/// own targets.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("xemsg=debug,xemsg_core=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
