use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "commands",
    version,
    about = "Display command log from a database.",
    disable_version_flag = true
)]
pub struct Args {
    /// SQLite database holding the command log
    #[arg(long, env = "COMMANDS_DB_PATH")]
    pub database_path: Option<PathBuf>,
    /// Table to query
    #[arg(long, env = "COMMANDS_DB_TABLE")]
    pub database_table: Option<String>,
    /// Address to bind to
    #[arg(short, long, env = "COMMANDS_BIND")]
    pub bind: Option<String>,
    /// Port to listen on
    #[arg(short, long, env = "COMMANDS_PORT")]
    pub port: Option<u16>,
    /// Show start times in the host time zone instead of UTC
    #[arg(
        long,
        env = "COMMANDS_LOCAL_TIME",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub local_time: bool,
    /// Seconds before an in-flight request is abandoned
    #[arg(long, env = "COMMANDS_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,
    /// Config file of KEY=VALUE lines (default: ~/.config/commands/.env)
    #[arg(long, env = "COMMANDS_CONFIG")]
    pub config: Option<PathBuf>,
    /// Log every request and the statements it runs
    #[arg(short, long)]
    pub verbose: bool,
    /// Display version and exit
    #[arg(short = 'V', long)]
    pub version: bool,
}

pub fn version_line() -> String {
    format!("commands v{}\n", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "commands",
            "--database-path",
            "/var/lib/history.db",
            "--database-table",
            "history",
            "-b",
            "127.0.0.1",
            "-p",
            "9000",
            "--local-time",
            "-v",
        ])
        .unwrap();
        assert_eq!(
            args.database_path.as_deref(),
            Some(std::path::Path::new("/var/lib/history.db"))
        );
        assert_eq!(args.database_table.as_deref(), Some("history"));
        assert_eq!(args.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(args.port, Some(9000));
        assert!(args.local_time);
        assert!(args.verbose);
        assert!(!args.version);
    }

    #[test]
    fn rejects_positional_arguments() {
        assert!(Args::try_parse_from(["commands", "extra"]).is_err());
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Args::try_parse_from(["commands", "-p", "70000"]).is_err());
    }

    #[test]
    fn local_time_env_accepts_truthy_words() {
        for (raw, expected) in [
            ("1", true),
            ("yes", true),
            ("on", true),
            ("0", false),
            ("off", false),
        ] {
            std::env::set_var("COMMANDS_LOCAL_TIME", raw);
            let parsed = Args::try_parse_from(["commands"]);
            std::env::remove_var("COMMANDS_LOCAL_TIME");
            assert_eq!(parsed.unwrap().local_time, expected, "COMMANDS_LOCAL_TIME={raw}");
        }
    }

    #[test]
    fn version_line_format() {
        assert!(version_line().starts_with("commands v"));
        assert!(version_line().ends_with('\n'));
    }
}
