use crate::output;
use anyhow::Result;
use clap::Args;
use staticconf::DEFAULT;
use std::path::PathBuf;

#[derive(Args)]
pub struct ShowArgs {
    #[arg(required = true, help = "Configuration files, later ones override earlier ones")]
    pub files: Vec<PathBuf>,

    #[arg(long, short, default_value = DEFAULT, help = "Namespace to load into")]
    pub namespace: String,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub fn run(args: ShowArgs) -> Result<()> {
    let (_registry, values) = super::load_files(&args.files, &args.namespace, false)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output::values_json(&values))?);
        return Ok(());
    }

    output::header(&format!("Namespace: {}", args.namespace));
    if values.is_empty() {
        output::info("no values loaded");
    }
    output::values(&values);
    Ok(())
}
