use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use staticconf::{ConfigFacade, DEFAULT, FileSource, Registry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Args)]
pub struct WatchArgs {
    #[arg(help = "Configuration file to watch")]
    pub file: PathBuf,

    #[arg(long, short, default_value = DEFAULT, help = "Namespace to load into")]
    pub namespace: String,

    #[arg(long, default_value_t = 1.0, help = "Seconds between change checks")]
    pub interval: f64,

    #[arg(long, help = "Stop after this many checks")]
    pub checks: Option<u64>,
}

fn parse_interval(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("invalid --interval {seconds}: expected a finite, non-negative number of seconds"))
}

pub fn run(args: WatchArgs) -> Result<()> {
    let interval = parse_interval(args.interval)?;
    let registry = Arc::new(Registry::new());
    let source = FileSource::detect(&args.file)?;
    let mut facade = ConfigFacade::load(&registry, source, &args.namespace, interval)?;

    output::header(&format!("Watching {}", args.file.display()));
    output::values(&registry.get_or_create(&args.namespace).values());

    let mut checks = 0u64;
    while args.checks.is_none_or(|limit| checks < limit) {
        std::thread::sleep(interval);
        checks += 1;
        match facade.reload_if_changed(false) {
            Ok(Some(values)) => {
                info!(file = %args.file.display(), keys = values.len(), "Configuration reloaded");
                output::header(&format!("Reloaded {}", args.file.display()));
                output::values(&values);
            }
            Ok(None) => {}
            Err(e) => output::error(&e.to_string()),
        }
    }
    Ok(())
}
