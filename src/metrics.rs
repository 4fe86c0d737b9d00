use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    pub static ref RUNS_STARTED: IntCounterVec = register_int_counter_vec!(
        "ingest_runs_started_total",
        "Parse runs started, by declared media kind",
        &["media_kind"]
    )
    .unwrap();

    pub static ref RUNS_FINISHED: IntCounterVec = register_int_counter_vec!(
        "ingest_runs_finished_total",
        "Parse runs finished, by outcome (done, capped, error, cancelled)",
        &["outcome"]
    )
    .unwrap();

    pub static ref ITEMS_EMITTED: IntCounter = register_int_counter!(
        "ingest_items_emitted_total",
        "Items delivered to consumers in batches"
    )
    .unwrap();

    pub static ref BATCHES_FLUSHED: IntCounter = register_int_counter!(
        "ingest_batches_flushed_total",
        "Batches delivered to consumers"
    )
    .unwrap();

    pub static ref RECORDS_SKIPPED: IntCounterVec = register_int_counter_vec!(
        "ingest_records_skipped_total",
        "Playlist entries not emitted, by reason (adult, duplicate, incomplete)",
        &["reason"]
    )
    .unwrap();
}
