use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Args;
use crate::models::TableName;
use crate::query::Database;
use crate::view::{CellFormat, DisplayZone};

const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: Database,
    pub bind: String,
    pub port: u16,
    pub cell_format: CellFormat,
    pub request_timeout: Duration,
    pub verbose: bool,
}

/// `~/.config/commands/.env` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("commands").join(".env"))
}

impl Config {
    /// Flags and env vars (already merged by clap) win over the config file.
    pub fn load(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => load_config_file(path)?,
            None => default_config_path()
                .filter(|p| p.exists())
                .map(|p| load_config_file(&p))
                .transpose()?
                .unwrap_or_default(),
        };
        Self::resolve(args, &file)
    }

    pub fn resolve(args: Args, file: &HashMap<String, String>) -> Result<Self> {
        let from_file = |key: &str| file.get(key).filter(|v| !v.is_empty()).cloned();

        let path = args
            .database_path
            .or_else(|| from_file("COMMANDS_DB_PATH").map(PathBuf::from))
            .ok_or_else(|| anyhow::anyhow!("COMMANDS_DB_PATH is empty"))?;

        let table = args
            .database_table
            .or_else(|| from_file("COMMANDS_DB_TABLE"))
            .ok_or_else(|| anyhow::anyhow!("COMMANDS_DB_TABLE is empty"))?;
        let table = TableName::parse(&table)?;

        let bind = args
            .bind
            .or_else(|| from_file("COMMANDS_BIND"))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = match args.port {
            Some(port) => port,
            None => match from_file("COMMANDS_PORT") {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("COMMANDS_PORT is not a valid port: {raw}"))?,
                None => DEFAULT_PORT,
            },
        };

        let request_timeout = match args.request_timeout {
            Some(secs) => secs,
            None => match from_file("COMMANDS_REQUEST_TIMEOUT") {
                Some(raw) => raw.parse().with_context(|| {
                    format!("COMMANDS_REQUEST_TIMEOUT is not a number of seconds: {raw}")
                })?,
                None => DEFAULT_REQUEST_TIMEOUT_SECS,
            },
        };

        let local_time = args.local_time
            || from_file("COMMANDS_LOCAL_TIME").is_some_and(|v| is_truthy(&v));

        Ok(Self {
            database: Database::new(path, table),
            bind,
            port,
            cell_format: CellFormat {
                zone: if local_time {
                    DisplayZone::Local
                } else {
                    DisplayZone::Utc
                },
            },
            request_timeout: Duration::from_secs(request_timeout),
            verbose: args.verbose,
        })
    }
}

pub fn load_config_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    Ok(parse_config(&content))
}

fn parse_config(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter(|l| !l.trim_start().starts_with('#') && !l.trim().is_empty())
        .filter_map(|l| {
            let l = l.trim_start();
            let l = l.strip_prefix("export ").unwrap_or(l);
            let (k, v) = l.split_once('=')?;
            Some((k.trim().to_string(), unquote(v.trim()).to_string()))
        })
        .collect()
}

fn unquote(v: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
