use clap::Parser;
use ragrouter::Settings;
use ragrouter::cli::commands::{init, models, serve};
use ragrouter::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // A local .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Init writes the settings file, so it runs before any is loaded
    if let Commands::Init { force } = cli.command {
        init::run_init(force);
        return;
    }

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    ragrouter::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Config => init::run_config(&config),
        Commands::Serve { bind } => serve::run(config, bind).await,
        Commands::Models { method } => {
            if let Err(e) = models::run(&config, &method).await {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Init { .. } => {}
    }
}
