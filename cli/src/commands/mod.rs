pub mod show;
pub mod validate;
pub mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use staticconf::{ConfigValues, FileSource, LoadOptions, Registry};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "staticconf",
    author,
    version,
    about = "Inspect, validate and watch static configuration files",
    long_about = "Loads YAML, JSON, TOML, INI, XML and properties files into a namespace the same \
                  way an application would.\nThe file format is chosen from the extension. Later \
                  files override earlier ones."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Print the merged, flattened configuration")]
    Show(show::ShowArgs),

    #[command(about = "Check required keys and report unknown ones")]
    Validate(validate::ValidateArgs),

    #[command(about = "Poll a file and print the configuration whenever it changes")]
    Watch(watch::WatchArgs),
}

/// Load `files` in order into `namespace` of a fresh registry.
pub(crate) fn load_files(
    files: &[PathBuf],
    namespace: &str,
    error_on_unknown: bool,
) -> Result<(Arc<Registry>, ConfigValues)> {
    let registry = Arc::new(Registry::new());
    let options = LoadOptions::new()
        .namespace(namespace)
        .error_on_unknown(error_on_unknown);
    for file in files {
        let source = FileSource::detect(file)?;
        registry.load(&source, &options)?;
    }
    let merged = registry.get_or_create(namespace).values().as_ref().clone();
    Ok((registry, merged))
}
