use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// `verbose` lowers the threshold to DEBUG; otherwise `default_level` applies.
/// Output goes to stderr so it never mixes with command output on stdout.
pub fn init(verbose: bool, default_level: Level) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { default_level };
    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
