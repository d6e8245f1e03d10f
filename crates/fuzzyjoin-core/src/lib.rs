//! fuzzyjoin core
//!
//! Streaming fuzzy-match operator for row-oriented pipelines. The operator
//! drains a lookup stream into an in-memory index once, then resolves each
//! row of a main stream to its closest lookup entry under a configurable
//! string-similarity algorithm and emits the row augmented with the match.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fuzzyjoin_core::{
//!     row, row_channel, AlgorithmCatalog, CancelToken, FieldMeta, FuzzyMatch, MatchConfig,
//!     RowSchema,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let schema = Arc::new(RowSchema::new(vec![FieldMeta::string("field1")]));
//! let config = MatchConfig {
//!     main_key_field: "field1".into(),
//!     lookup_key_field: "field1".into(),
//!     max_distance: 3.0,
//!     value_field: Some("closer".into()),
//!     ..Default::default()
//! };
//! let catalog = AlgorithmCatalog::default();
//! let mut op = FuzzyMatch::new(config, &catalog, schema.clone(), schema.clone()).unwrap();
//!
//! let (main_tx, main_rx) = row_channel(schema.clone(), 8);
//! let (lookup_tx, lookup_rx) = row_channel(schema, 8);
//! let (out_tx, mut out_rx) = row_channel(op.output_schema().clone(), 8);
//!
//! main_tx.send(row!["Catrine"]).await.unwrap();
//! lookup_tx.send(row!["John"]).await.unwrap();
//! lookup_tx.send(row!["Catriny"]).await.unwrap();
//! drop((main_tx, lookup_tx));
//!
//! op.run(main_rx, lookup_rx, out_tx, CancelToken::never()).await.unwrap();
//! assert_eq!(out_rx.recv().await, Some(row!["Catrine", true, "Catriny"]));
//! # }
//! ```

pub mod assembler;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod operator;
pub mod resolver;
pub mod row;
pub mod similarity;

pub use assembler::RowAssembler;
pub use channel::{
    cancel_signal, row_channel, CancelHandle, CancelToken, ChannelClosed, RowReceiver, RowSender,
};
pub use codec::decode_key;
pub use config::{LookupField, MatchConfig};
pub use error::{ConfigError, DecodeError, ErrorSender, OperatorError, Result, RowError, Side};
pub use index::{BuildStats, IndexBuilder, LookupEntry, LookupIndex};
pub use operator::{FuzzyMatch, OperatorState, OperatorStats};
pub use resolver::{MatchResolver, MatchResult};
pub use row::{Charset, FieldMeta, LogicalType, Row, RowSchema, StorageEncoding, Value};
pub use similarity::{AlgorithmCatalog, Family, Score, Similarity, SimilarityEngine};
