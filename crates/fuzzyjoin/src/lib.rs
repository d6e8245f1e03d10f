//! # fuzzyjoin
//!
//! Runs the fuzzy match operator from `fuzzyjoin-core` over JSON-lines row
//! files:
//! - **jsonl**: row file format (schema line, one JSON array per row)
//! - **pipeline**: reader, operator and writer tasks wired by row channels
//! - **error**: harness error type
//! - **tracing**: logging setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fuzzyjoin::pipeline::{load_config, Output, Pipeline};
//!
//! let config = load_config("join.json".as_ref()).await?;
//! let summary = Pipeline::new(config)
//!     .run("main.jsonl".as_ref(), "lookup.jsonl".as_ref(), Output::Stdout)
//!     .await?;
//! ```

pub mod error;
pub mod jsonl;
pub mod pipeline;
pub mod tracing;

pub use error::{Error, Result};
pub use pipeline::{load_config, JoinSummary, Output, Pipeline};
