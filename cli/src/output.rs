use colored::Colorize;
use staticconf::ConfigValues;

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

pub fn info(msg: &str) {
    eprintln!("{} {}", "info:".blue().bold(), msg);
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn values(values: &ConfigValues) {
    for (key, value) in values.iter() {
        println!("{} = {}", key.cyan(), value);
    }
}

pub fn values_json(values: &ConfigValues) -> serde_json::Value {
    serde_json::Value::Object(
        values
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_do_not_panic() {
        header("Header");
        info("info");
        warn("warning");
        error("error");
        success("success");
    }

    #[test]
    fn test_values_json_keeps_value_types() {
        let values: ConfigValues = [
            ("a.b", staticconf::Value::from(1)),
            ("c", staticconf::Value::from("2")),
            ("d", staticconf::Value::from(false)),
        ]
        .into_iter()
        .collect();
        let json = values_json(&values);
        assert_eq!(json["a.b"], 1);
        assert_eq!(json["c"], "2");
        assert_eq!(json["d"], false);
    }
}
