//! Builds a small dictionary, saves it, maps it back and runs every query.
//!
//! Run with: `cargo run --example sample`

use cdat_rs::{Dictionary8, Result};
use memmap2::Mmap;

fn show(name: &str, items: impl Iterator<Item = (Vec<u8>, u64)>) {
    println!("{} = {{", name);
    for (key, id) in items {
        println!("   ({}, {}),", String::from_utf8_lossy(&key), id);
    }
    println!("}}");
}

fn main() -> Result<()> {
    let mut keys = vec![
        "AirPods", "AirTag", "Mac", "MacBook", "MacBook_Air", "MacBook_Pro",
        "Mac_Mini", "Mac_Pro", "iMac", "iPad", "iPhone", "iPhone_SE",
    ];
    // Input must be sorted and unique.
    keys.sort_unstable();
    keys.dedup();

    let dir = std::env::temp_dir();
    let path = dir.join(format!("cdat-sample-{}.dic", std::process::id()));
    Dictionary8::build(&keys)?.save(&path)?;

    let dict = Dictionary8::<Mmap>::open_mmap(&path)?;
    // Or load it into memory: Dictionary8::load(&path)?

    println!("Number of keys: {}", dict.num_keys());
    println!("Number of trie nodes: {}", dict.num_nodes());
    println!("Number of DA units: {}", dict.num_units());
    println!("Memory usage in bytes: {}", dict.memory_in_bytes());

    let show_id = |id: Option<u64>| id.map_or_else(|| "none".to_string(), |id| id.to_string());
    println!("Lookup(Mac_Pro) = {}", show_id(dict.lookup("Mac_Pro")));
    println!("Lookup(Google_Pixel) = {}", show_id(dict.lookup("Google_Pixel")));
    if let Some(key) = dict.decode(4) {
        println!("Decode(4) = {}", String::from_utf8_lossy(&key));
    }

    show("CommonPrefixSearch(MacBook_Air)", dict.prefix_iter("MacBook_Air"));
    show("PredictiveSearch(Mac)", dict.predictive_iter("Mac"));
    show("Enumerate()", dict.enumerate());

    drop(dict);
    std::fs::remove_file(&path)?;
    Ok(())
}
