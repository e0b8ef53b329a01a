//! Builds a dictionary file from a key list.
//!
//! ```bash
//! cdat_build keys.txt keys.dic --width 16
//! ```

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use cdat_rs::{AnyDictionary, BuildConfig, CodeWidth};
use cdat_tools::{init_logging, read_keys, sort_dedup};
use clap::Parser;
use tracing::info;

/// Build a compact double-array dictionary
#[derive(Parser, Debug)]
#[command(name = "cdat_build")]
#[command(about = "Build a trie dictionary from a newline-separated key list")]
struct Args {
    /// Input file with one key per line ("-" reads stdin)
    input_keys: PathBuf,

    /// Output filepath of the trie dictionary
    output_dic: PathBuf,

    /// Label width of the code units (7, 8, 15 or 16)
    #[arg(short, long, default_value = "8")]
    width: CodeWidth,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut keys = if args.input_keys.as_os_str() == "-" {
        read_keys(io::stdin().lock()).context("reading keys from stdin")?
    } else {
        let file = File::open(&args.input_keys)
            .with_context(|| format!("opening {}", args.input_keys.display()))?;
        read_keys(BufReader::new(file))
            .with_context(|| format!("reading {}", args.input_keys.display()))?
    };
    sort_dedup(&mut keys);

    let start = Instant::now();
    let config = BuildConfig::new(args.width);
    let dict = AnyDictionary::build(&keys, &config).context("building dictionary")?;
    dict.save(&args.output_dic)
        .with_context(|| format!("writing {}", args.output_dic.display()))?;

    info!(
        width = %dict.width(),
        num_keys = dict.num_keys(),
        num_nodes = dict.num_nodes(),
        num_units = dict.num_units(),
        bytes = dict.memory_in_bytes(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        output = %args.output_dic.display(),
        "dictionary built"
    );
    Ok(())
}
