//! Integration tests for StrataKV
//!
//! Note: component-level coverage lives in dedicated test files:
//! - TableMemory tests: tests/table_tests.rs
//! - WritePipeline tests: tests/pipeline_tests.rs
//!
//! This file contains configuration tests and end-to-end ingest runs that
//! span the whole freeze/flush/thaw machinery.

mod common;

use common::{slot, CollectFlusher, WideSlotPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stratakv::{Config, RecordPolicy, WritePipeline};

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.label, "memtable");
    assert_eq!(config.freeze_watermark, 0); // 0 = at capacity
    assert_eq!(config.initial_snapshot, 0);
}

#[test]
fn test_config_builder() {
    let config = Config::builder()
        .label("transfers")
        .freeze_watermark(512)
        .initial_snapshot(7)
        .build();

    assert_eq!(config.label, "transfers");
    assert_eq!(config.freeze_watermark, 512);
    assert_eq!(config.initial_snapshot, 7);
}

#[test]
fn test_config_builder_default_values() {
    // Builder should start with default values
    let config = Config::builder().build();
    let default_config = Config::default();

    assert_eq!(config.label, default_config.label);
    assert_eq!(config.freeze_watermark, default_config.freeze_watermark);
    assert_eq!(config.initial_snapshot, default_config.initial_snapshot);
}

// =============================================================================
// End-to-End Ingest Tests
// =============================================================================

#[test]
fn test_sustained_ingest_flushes_everything() {
    let mut rng = StdRng::seed_from_u64(42);
    let config = Config::builder().label("ingest").build();
    let mut pipeline =
        WritePipeline::<WideSlotPolicy, _>::new(config, CollectFlusher::new()).unwrap();

    const OPS: usize = 10_000;
    for op in 0..OPS {
        let key = rng.gen_range(0..4096);
        if rng.gen_range(0..100) < 10 {
            pipeline.delete(key).unwrap();
        } else {
            pipeline.put(slot(key, op as u64)).unwrap();
        }
    }
    pipeline.checkpoint().unwrap();

    // Every operation appended exactly one record, and after the final
    // checkpoint every record has reached the flusher
    assert_eq!(pipeline.flusher().records_flushed(), OPS);

    let runs = &pipeline.flusher().runs;
    let mut previous_snapshot = 0;
    for (snapshot, run) in runs {
        assert!(*snapshot > previous_snapshot);
        previous_snapshot = *snapshot;

        assert!(run.len() <= WideSlotPolicy::CAPACITY);
        for pair in run.windows(2) {
            assert!(pair[0].key <= pair[1].key);
        }
    }
}

#[test]
fn test_ingest_with_periodic_checkpoints() {
    let mut rng = StdRng::seed_from_u64(7);
    let config = Config::builder().freeze_watermark(256).build();
    let mut pipeline =
        WritePipeline::<WideSlotPolicy, _>::new(config, CollectFlusher::new()).unwrap();

    for op in 0..2_000usize {
        pipeline.put(slot(rng.gen_range(0..512), op as u64)).unwrap();
        if (op + 1) % 300 == 0 {
            pipeline.checkpoint().unwrap();
        }
    }
    pipeline.checkpoint().unwrap();

    assert_eq!(pipeline.flusher().records_flushed(), 2_000);
    assert!(pipeline.table_mutable().is_empty());

    // Checkpoint-forced runs may be short, but never above the watermark
    assert!(pipeline
        .flusher()
        .runs
        .iter()
        .all(|(_, run)| run.len() <= 256));
}
