use chat_stream::cli::{run, Args};
use clap::Parser;
use colored::Colorize;
use log::{error, LevelFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_user_visible() => {
            eprintln!("{} {e}", "Error:".red().bold());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            Err(anyhow::Error::new(e).context("query failed"))
        }
    }
}
