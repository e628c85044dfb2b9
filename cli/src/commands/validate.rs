use crate::output;
use anyhow::{Result, bail};
use clap::Args;
use staticconf::validation::validator_names;
use staticconf::{DEFAULT, NamespaceReaders, Value};
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    #[arg(required = true, help = "Configuration files, later ones override earlier ones")]
    pub files: Vec<PathBuf>,

    #[arg(long, short, default_value = DEFAULT, help = "Namespace to load into")]
    pub namespace: String,

    #[arg(
        long = "require",
        short = 'r',
        value_name = "KEY[:TYPE]",
        help = "Key that must be present, optionally with a type (string, bool, int, float, date, \
                datetime, time, list, set, tuple, regex, log_level)"
    )]
    pub required: Vec<String>,

    #[arg(long, help = "Fail when a loaded key is not required")]
    pub strict: bool,
}

/// Split `KEY[:TYPE]`. The text after the last colon is a type only when it
/// names a validator, so keys that contain colons stay whole.
fn parse_requirement(requirement: &str) -> (&str, &str) {
    match requirement.rsplit_once(':') {
        Some((key, kind)) if !key.is_empty() && validator_names().contains(&kind) => (key, kind),
        _ => (requirement, "any"),
    }
}

fn check(readers: &NamespaceReaders, key: &str, kind: &str) -> Result<String> {
    let rendered = match kind {
        "any" => readers.read(key, None)?.to_string(),
        "string" => readers.read_string(key, None)?,
        "bool" => readers.read_bool(key, None)?.to_string(),
        "int" => readers.read_int(key, None)?.to_string(),
        "float" => readers.read_float(key, None)?.to_string(),
        "date" => readers.read_date(key, None)?.to_string(),
        "datetime" => readers.read_datetime(key, None)?.to_string(),
        "time" => readers.read_time(key, None)?.to_string(),
        "list" => Value::List(readers.read_list(key, None)?).to_string(),
        "set" => Value::Set(readers.read_set(key, None)?).to_string(),
        "tuple" => Value::Tuple(readers.read_tuple(key, None)?).to_string(),
        "regex" => readers.read_regex(key, None)?.to_string(),
        "log_level" => readers.read_log_level(key, None)?.to_string(),
        other => bail!("unknown value type '{other}' for key '{key}'"),
    };
    Ok(rendered)
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let (registry, _values) = super::load_files(&args.files, &args.namespace, args.strict)?;
    let readers = NamespaceReaders::new(&registry, args.namespace.clone());

    let mut failures = 0usize;
    for requirement in &args.required {
        let (key, kind) = parse_requirement(requirement);
        match check(&readers, key, kind) {
            Ok(value) => output::success(&format!("{key} = {value}")),
            Err(e) => {
                failures += 1;
                output::error(&e.to_string());
            }
        }
    }

    let namespace = registry.get_or_create(&args.namespace);
    match namespace.check_unknown_keys() {
        Ok(unread) if !args.required.is_empty() => {
            for key in unread {
                output::warn(&format!("unexpected key: {key}"));
            }
        }
        Ok(_) => {}
        Err(e) => {
            failures += 1;
            output::error(&e.to_string());
        }
    }

    if failures > 0 {
        bail!("{failures} problem(s) found in namespace '{}'", args.namespace);
    }
    output::success("configuration is valid");
    Ok(())
}
