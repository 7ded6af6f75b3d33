//! Spreads a word list across a ring and prints how many words each node got.
//!
//! ```text
//! cargo run --example distribution -- --replica-count 16 --node-count 8
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hashring::{Hash32, HashRing, RingConfig, Sip32};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HashKind {
    Fnv,
    Sip,
}

#[derive(Debug, Parser)]
#[command(about = "Report how keys are distributed across the nodes of a hash ring")]
struct Args {
    /// Positions per node
    #[arg(short = 'r', long, default_value_t = RingConfig::default().replica_count)]
    replica_count: usize,

    /// Number of nodes, named node-0 .. node-N
    #[arg(short = 'n', long, default_value_t = 8)]
    node_count: usize,

    /// Maximum number of words to locate
    #[arg(short = 'k', long, default_value_t = 6_000_000)]
    key_count: usize,

    /// Word list, one key per line
    #[arg(short = 'w', long, default_value = "/usr/share/dict/words")]
    words: PathBuf,

    #[arg(long, value_enum, default_value_t = HashKind::Fnv)]
    hash: HashKind,
}

/// Yields one word per line. Bytes that are not valid UTF-8 are replaced
/// instead of ending the run.
fn read_words<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<String>> {
    reader.split(b'\n').map(|line| {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    })
}

fn distribute<H: Hash32>(ring: HashRing<H>, args: &Args) -> anyhow::Result<BTreeMap<String, usize>> {
    for i in 0..args.node_count {
        ring.add(&format!("node-{i}"))?;
    }
    info!(nodes = ring.len(), positions = ring.vlen(), "ring ready");

    let file = File::open(&args.words)
        .with_context(|| format!("failed to open {}", args.words.display()))?;

    let mut counts = BTreeMap::new();
    for word in read_words(BufReader::new(file)).take(args.key_count) {
        let word = word.context("failed to read word list")?;
        *counts.entry(ring.locate(&word)?).or_insert(0) += 1;
    }

    Ok(counts)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = RingConfig {
        replica_count: args.replica_count,
    };

    let counts = match args.hash {
        HashKind::Fnv => distribute(HashRing::from_config(&config)?, &args)?,
        HashKind::Sip => distribute(
            HashRing::with_hasher(config.replica_count, Sip32::default())?,
            &args,
        )?,
    };

    let total: usize = counts.values().sum();
    info!(total, "located keys");

    for (node, count) in counts {
        println!("{node}: {count}");
    }

    Ok(())
}
