// src/main.rs
// CLI entry point.
// Usage:
//   charity_scrape ingest eins.csv
//   charity_scrape export --out charity_data.json
//   charity_scrape remove 010445046

use std::fs;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use charity_scrape::cli::{Cli, Command, ConsoleProgress};
use charity_scrape::config::Config;
use charity_scrape::input;
use charity_scrape::net::HttpFetcher;
use charity_scrape::run::Runner;
use charity_scrape::store::Store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let store = Store::open(&config.db_path)?;

    match cli.command {
        Command::Ingest { input: files } => {
            let keys = input::load_keys_many(&files)?;
            let fetcher = HttpFetcher::new(&config)?;
            let runner = Runner::new(&config, fetcher, &store);
            let mut progress = ConsoleProgress::default();
            let summary = runner.run(&keys, Some(&mut progress))?;
            println!(
                "done: {} persisted, {} skipped, {} failed",
                summary.persisted, summary.skipped, summary.failed
            );
        }
        Command::Export { out } => {
            let doc = store.export_json()?;
            let text = serde_json::to_string_pretty(&doc)?;
            match out {
                Some(path) => fs::write(path, text)?,
                None => println!("{text}"),
            }
        }
        Command::Remove { ein } => {
            let removed = store.delete_by_key(&ein)?;
            println!("removed {removed} row(s) for {ein}");
        }
    }

    Ok(())
}
