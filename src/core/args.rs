use clap::Parser;
use log::kv::{ToValue, Value};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about = "Cross-database query benchmark service")]
pub struct CliArgs {
    #[arg(short, long)]
    pub config: Option<String>,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = CliArgs::parse_from(["self", "--config", "bench.toml"]);
        assert_eq!(
            args,
            CliArgs {
                config: Some("bench.toml".to_string())
            }
        );
    }

    #[test]
    fn test_args_without_config() {
        let args = CliArgs::parse_from(["self"]);
        assert_eq!(args, CliArgs { config: None });
    }
}
