pub mod classifier;
pub mod engine;
pub mod merge_sink;
pub mod scanner;
pub mod source;
pub mod store;
