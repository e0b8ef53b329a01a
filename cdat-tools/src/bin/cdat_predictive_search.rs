//! Answers predictive-search queries read from stdin, one per line.
//!
//! Each query produces one line: `"<count> found\t<key1>\t<key2>..."`, listing
//! at most `-n` keys in lexicographic order.
//!
//! ```bash
//! printf 'Mac\niP\n' | cdat_predictive_search keys.dic -n 3
//! ```

use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use cdat_tools::{init_logging, open_dictionary, run_predictive_search};
use clap::Parser;
use tracing::info;

/// Predictive search over a trie dictionary
#[derive(Parser, Debug)]
#[command(name = "cdat_predictive_search")]
#[command(about = "Print keys starting with each query line read from stdin")]
struct Args {
    /// Input filepath of trie dictionary
    input_dic: PathBuf,

    /// The max number of results
    #[arg(short = 'n', long, default_value = "10")]
    max_num_results: usize,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let dict = open_dictionary(&args.input_dic)
        .with_context(|| format!("mapping {}", args.input_dic.display()))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let served = run_predictive_search(
        &dict,
        stdin.lock(),
        BufWriter::new(stdout.lock()),
        args.max_num_results,
    )
    .context("serving queries")?;

    info!(queries = served, num_keys = dict.num_keys(), "done");
    Ok(())
}
