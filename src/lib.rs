pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::EngineConfig;
pub use crate::core::error::{CoreError, CoreResult};
pub use crate::core::progress::ProgressReporter;
pub use crate::core::state::Engine;

/// Install a `fmt` subscriber honouring `RUST_LOG`, defaulting to
/// `info,mcfetch=debug`. Hosts with their own subscriber skip this.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mcfetch=debug")),
        )
        .try_init();
}
