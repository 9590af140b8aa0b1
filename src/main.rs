// src/main.rs
use clap::Parser;
use panda_rs::cli::Args;
use panda_rs::options::Options;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let result = run(args).await;
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(args: Args) -> panda_rs::Result<()> {
    let options = Options::from_cli(args)?;
    panda_rs::commands::run(options).await
}
