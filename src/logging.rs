//! Logging setup: `sandbox=info` by default, `sandbox=debug` under `--verbose`,
//! always overridable via `RUST_LOG` (matches the teacher's `main.rs` shape).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) -> Result<()> {
    let default_directive = if verbose { "sandbox=debug" } else { "sandbox=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_directive.parse()?))
        .init();
    Ok(())
}
