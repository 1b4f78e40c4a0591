use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use gavel::cli::{run, status, Cli, Commands};
use gavel::config::Config;
use gavel::domain::AuctionId;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = match Config::load(&args.config) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Failed to load config: {e}");
                    std::process::exit(1);
                }
            };

            if let Some(ref level) = args.log_level {
                config.logging.level = level.clone();
            }
            if args.json_logs {
                config.logging.format = "json".to_string();
            }
            config.init_logging();

            let auction = AuctionId::new(args.auction);
            info!(auction = %auction, "gavel starting");

            tokio::select! {
                result = run::execute(&config, auction) => {
                    if let Err(e) = result {
                        error!(auction = %auction, error = %e, "Settlement run failed");
                        std::process::exit(e.exit_code());
                    }
                }
                _ = signal::ctrl_c() => {
                    // Safe: each completed step is persisted, so the next
                    // trigger resumes from it. Outstanding randomness
                    // requests still resolve on-chain.
                    warn!(auction = %auction, "Shutdown signal received, run interrupted");
                }
            }

            info!(auction = %auction, "gavel stopped");
        }
        Commands::Status(args) => {
            let config = match Config::load(&args.config) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Failed to load config: {e}");
                    std::process::exit(1);
                }
            };

            if let Err(e) = status::execute(&config, AuctionId::new(args.auction)).await {
                eprintln!("Failed to read status: {e}");
                std::process::exit(1);
            }
        }
    }
}
