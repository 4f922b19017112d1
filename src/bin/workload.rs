//! StrataKV Workload Binary
//!
//! Drives a write pipeline with a synthetic insert/delete workload and
//! reports what reached the flusher.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{fmt, EnvFilter};

use stratakv::{Config, Flusher, RecordPolicy, Result, WritePipeline};

/// StrataKV Workload
#[derive(Parser, Debug)]
#[command(name = "stratakv-workload")]
#[command(about = "Synthetic ingest workload for the StrataKV memtable engine")]
#[command(version)]
struct Args {
    /// Number of operations to run
    #[arg(short, long, default_value = "100000")]
    records: usize,

    /// Distinct key space
    #[arg(short, long, default_value = "65536")]
    keys: u64,

    /// Fraction of operations that are deletes (percent)
    #[arg(short, long, default_value = "10")]
    delete_percent: u32,

    /// RNG seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Force a checkpoint every N operations (0 = only when full)
    #[arg(short, long, default_value = "0")]
    checkpoint_every: usize,
}

/// A ledger-style transfer record keyed by id
#[derive(Debug, Clone, Copy)]
struct Transfer {
    id: u64,
    amount: u64,
}

/// Record family for the workload: 8192 transfers per table
struct TransferPolicy;

impl RecordPolicy for TransferPolicy {
    type Record = Transfer;
    type Key = u64;
    const CAPACITY: usize = 8192;

    fn key_of(record: &Transfer) -> u64 {
        record.id
    }

    fn tombstone_from(id: u64) -> Transfer {
        Transfer {
            id,
            amount: u64::MAX,
        }
    }
}

/// Flusher that counts runs and tracks the key range it has seen
#[derive(Default)]
struct SinkFlusher {
    runs: usize,
    records: usize,
    key_min: Option<u64>,
    key_max: Option<u64>,
}

impl Flusher<TransferPolicy> for SinkFlusher {
    fn flush(&mut self, snapshot_min: u64, records: &[Transfer]) -> Result<()> {
        self.runs += 1;
        self.records += records.len();

        // Runs arrive sorted, so the range is the first and last record
        if let (Some(first), Some(last)) = (records.first(), records.last()) {
            self.key_min = Some(self.key_min.map_or(first.id, |k| k.min(first.id)));
            self.key_max = Some(self.key_max.map_or(last.id, |k| k.max(last.id)));
        }

        tracing::debug!(snapshot_min, len = records.len(), "run absorbed by sink");
        Ok(())
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stratakv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("StrataKV Workload v{}", stratakv::VERSION);
    tracing::info!(
        "{} operations over {} keys, {}% deletes, seed {}",
        args.records,
        args.keys,
        args.delete_percent,
        args.seed
    );

    let config = Config::builder().label("transfers").build();

    let mut pipeline = match WritePipeline::new(config, SinkFlusher::default()) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to construct pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let mut rng = StdRng::seed_from_u64(args.seed);

    for op in 0..args.records {
        let id = rng.gen_range(0..args.keys);
        let result = if rng.gen_range(0..100) < args.delete_percent {
            pipeline.delete(id)
        } else {
            pipeline.put(Transfer {
                id,
                amount: rng.gen_range(1..1_000_000),
            })
        };
        if let Err(e) = result {
            tracing::error!("Operation {} failed: {}", op, e);
            std::process::exit(1);
        }

        if args.checkpoint_every > 0 && (op + 1) % args.checkpoint_every == 0 {
            if let Err(e) = pipeline.checkpoint() {
                tracing::error!("Checkpoint failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Flush the tail so the sink has seen everything
    if let Err(e) = pipeline.checkpoint() {
        tracing::error!("Final checkpoint failed: {}", e);
        std::process::exit(1);
    }

    let sink = pipeline.flusher();
    tracing::info!(
        "Done: {} runs, {} records flushed, snapshot {}",
        sink.runs,
        sink.records,
        pipeline.snapshot()
    );
    if let (Some(min), Some(max)) = (sink.key_min, sink.key_max) {
        tracing::info!("Flushed key range: {} ..= {}", min, max);
    }
}
