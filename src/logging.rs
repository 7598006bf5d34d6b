// Tracing setup shared by every subcommand

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "safewalk=info,tower_http=info";
const VERBOSE_FILTER: &str = "safewalk=debug,tower_http=debug";

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
