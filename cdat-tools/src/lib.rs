//! Shared plumbing for the `cdat_build` and `cdat_predictive_search` binaries.

use std::io::{self, BufRead, Write};
use std::path::Path;

use cdat_rs::AnyDictionary;
use memmap2::Mmap;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG` (default `info`),
/// keeping stdout for results.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Maps a dictionary file, dispatching on the width in its header.
pub fn open_dictionary(path: &Path) -> cdat_rs::Result<AnyDictionary<Mmap>> {
    let dict = AnyDictionary::open_mmap(path)?;
    debug!(width = %dict.width(), num_keys = dict.num_keys(), "opened dictionary");
    Ok(dict)
}

/// Reads one line from `reader` into `buf` without its line terminator.
/// Returns `false` at end of input.
pub fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(true)
}

/// Reads one key per line. Blank lines are skipped.
pub fn read_keys<R: BufRead>(mut reader: R) -> io::Result<Vec<Vec<u8>>> {
    let mut keys = Vec::new();
    let mut line = Vec::new();
    while read_line(&mut reader, &mut line)? {
        if !line.is_empty() {
            keys.push(line.clone());
        }
    }
    Ok(keys)
}

/// Sorts and removes duplicates, the order construction requires.
pub fn sort_dedup(keys: &mut Vec<Vec<u8>>) {
    keys.sort_unstable();
    keys.dedup();
}

/// Writes `"<count> found\t<key1>\t<key2>..."`, listing at most `max` keys.
pub fn write_result_line<W: Write>(
    out: &mut W,
    count: usize,
    keys: &[Vec<u8>],
    max: usize,
) -> io::Result<()> {
    write!(out, "{} found\t", count)?;
    for (i, key) in keys.iter().take(max).enumerate() {
        if i != 0 {
            out.write_all(b"\t")?;
        }
        out.write_all(key)?;
    }
    out.write_all(b"\n")?;
    out.flush()
}

/// Answers each query line of `input` with one result line on `output`.
/// Returns the number of queries served.
pub fn run_predictive_search<D, R, W>(
    dict: &AnyDictionary<D>,
    mut input: R,
    mut output: W,
    max_num_results: usize,
) -> io::Result<usize>
where
    D: AsRef<[u8]>,
    R: BufRead,
    W: Write,
{
    let mut query = Vec::new();
    let mut results: Vec<Vec<u8>> = Vec::with_capacity(1 << 10);
    let mut served = 0;
    while read_line(&mut input, &mut query)? {
        results.clear();
        dict.predictive_search(&query, |_, key| results.push(key.to_vec()));
        write_result_line(&mut output, results.len(), &results, max_num_results)?;
        served += 1;
    }
    Ok(served)
}
