// src/cli.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::progress::Progress;

#[derive(Debug, Parser)]
#[command(name = "charity_scrape", version, about = "Ingest charity profiles by EIN into SQLite")]
pub struct Cli {
    /// Optional TOML config file; flags below override it.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database file.
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and persist every EIN listed in the input files.
    Ingest {
        /// CSV file(s) carrying an EIN column.
        #[arg(required = true, value_name = "CSV")]
        input: Vec<PathBuf>,
    },
    /// Serialize the whole store to a JSON document.
    Export {
        /// Output path; stdout when omitted.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Remove one row by EIN (out-of-band maintenance).
    Remove {
        #[arg(value_name = "EIN")]
        ein: String,
    },
}

/// Progress sink that prints one line per processed key.
#[derive(Default)]
pub struct ConsoleProgress {
    total: usize,
    seen: usize,
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
    }

    fn log(&mut self, msg: &str) {
        println!("{msg}");
    }

    fn item_done(&mut self, ein: &str) {
        self.seen += 1;
        println!("[{}/{}] {} ok", self.seen, self.total, ein);
    }

    fn item_failed(&mut self, ein: &str, why: &str) {
        self.seen += 1;
        println!("[{}/{}] {} FAILED: {}", self.seen, self.total, ein, why);
    }
}
