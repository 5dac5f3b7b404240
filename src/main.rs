use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands_web::cli::{self, Args};
use commands_web::config::Config;
use commands_web::dashboard;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        print!("{}", cli::version_line());
        return Ok(());
    }

    init_tracing(args.verbose);

    let config = Config::load(args)?;
    tracing::info!(
        database = %config.database.path().display(),
        table = %config.database.table(),
        bind = %config.bind,
        port = config.port,
        zone = ?config.cell_format.zone,
        request_timeout = ?config.request_timeout,
        "resolved configuration"
    );

    dashboard::run(config).await
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "commands_web=debug,tower_http=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
