use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::uptime;

/// Installs a stderr subscriber for `--verbose` runs. Timestamps count from
/// process start so queue waits and cooldowns can be read off directly.
/// Stdout carries only the run output.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::DEBUG)
        .with_timer(uptime())
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install logger: {}", err))
}
