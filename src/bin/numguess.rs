//! numguess - Guess the Number in the terminal, plus the offline cache worker.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::env;

use numguess::cli::{self, Command};

fn print_usage() {
    eprintln!("Usage: numguess [OPTIONS] [COMMAND]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  play (default)        Play a game in the terminal");
    eprintln!("  cache install         Fetch the asset manifest into a fresh cache and activate it");
    eprintln!("  cache activate        Activate an installed cache, deleting older ones");
    eprintln!("  cache status          Show cached entries and missing assets");
    eprintln!("  cache fetch <url>     Serve one URL through the cache");
    eprintln!("  cache clear           Delete every cache");
    eprintln!("  push [body...]        Render a push notification as JSON");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH>   Config file (default: $NUMGUESS_CONFIG or the platform config dir)");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Logging is controlled by RUST_LOG (default: warn).");
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = match cli::parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if args.command == Command::Help {
        print_usage();
        return;
    }

    if let Err(e) = cli::run(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
