//! Public surface for the `schemagraph-converter` crate.
//!
//! Exposes the conversion pipeline and the store implementations so that
//! external crates (e.g. the conformance test suite) can run conversions
//! in-process without spawning the binary.

pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod trace;

pub use config::{ConversionConfig, ConverterSettings, DEFAULT_LOG_DEPTH};
pub use convert::{
    resolve_well_known_ids, stage_conversion, ConvertOutcome, ConvertReport, Converter,
    StagedConversion,
};
pub use error::{ConvertError, ConvertFailure, FailureReport};
pub use storage::{memory::MemoryStore, sqlite::SqliteStore, GraphStore, StoreError};
pub use trace::Trace;
