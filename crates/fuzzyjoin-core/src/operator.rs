//! Fuzzy match operator driver
//!
//! Two-phase operator: the lookup stream is drained into a [`LookupIndex`]
//! first, then every main row is resolved against it and emitted.
//!
//! ```text
//! Idle -> BuildingIndex -> Ready <-> Resolving
//!                            |
//!                            v
//!                         Draining
//!
//! any state -> Closed (cancellation)
//! ```
//!
//! The build phase waits on the lookup producer, so that producer must run
//! on its own task. The index is frozen behind an `Arc` before the first main
//! row is resolved and is never mutated afterwards.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assembler::RowAssembler;
use crate::channel::{CancelToken, RowReceiver, RowSender};
use crate::config::MatchConfig;
use crate::error::{ConfigError, ErrorSender, OperatorError, Result, RowError, Side};
use crate::index::{IndexBuilder, LookupIndex};
use crate::resolver::{MatchResolver, MatchResult};
use crate::row::{Row, RowSchema};
use crate::similarity::{AlgorithmCatalog, SimilarityEngine};

/// Operator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    Idle,
    BuildingIndex,
    Ready,
    Resolving,
    Draining,
    Closed,
}

/// Counters reported when the operator stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorStats {
    pub lookup_rows_read: u64,
    pub lookup_rows_skipped: u64,
    pub index_size: usize,
    pub main_rows_read: u64,
    pub rows_matched: u64,
    pub rows_emitted: u64,
    pub row_errors: u64,
    pub cancelled: bool,
}

/// Streaming fuzzy match between a main and a lookup row stream
#[derive(Debug)]
pub struct FuzzyMatch {
    config: MatchConfig,
    main_schema: Arc<RowSchema>,
    lookup_schema: Arc<RowSchema>,
    resolver: MatchResolver,
    assembler: RowAssembler,
    state: OperatorState,
    index: Option<Arc<LookupIndex>>,
    errors: Option<ErrorSender>,
    stats: OperatorStats,
}

impl FuzzyMatch {
    /// Validate `config` against both schemas and compute the output layout
    pub fn new(
        config: MatchConfig,
        catalog: &AlgorithmCatalog,
        main_schema: Arc<RowSchema>,
        lookup_schema: Arc<RowSchema>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let engine =
            SimilarityEngine::from_catalog(catalog, &config.algorithm, config.case_sensitive)?;
        if !lookup_schema.contains(&config.lookup_key_field) {
            return Err(ConfigError::MissingField {
                side: Side::Lookup,
                field: config.lookup_key_field.clone(),
            });
        }
        let resolver = MatchResolver::new(engine, &main_schema, &config)?;
        let assembler =
            RowAssembler::new(&main_schema, &lookup_schema, &config, resolver.family())?;

        debug!(
            algorithm = resolver.engine().name(),
            family = ?resolver.family(),
            output_width = assembler.width(),
            "Fuzzy match operator configured"
        );

        Ok(Self {
            config,
            main_schema,
            lookup_schema,
            resolver,
            assembler,
            state: OperatorState::Idle,
            index: None,
            errors: None,
            stats: OperatorStats::default(),
        })
    }

    /// Forward row-level errors to `errors` instead of only logging them
    pub fn with_error_channel(mut self, errors: ErrorSender) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn main_schema(&self) -> &Arc<RowSchema> {
        &self.main_schema
    }

    pub fn lookup_schema(&self) -> &Arc<RowSchema> {
        &self.lookup_schema
    }

    /// Schema of every emitted row, known before any row is read
    pub fn output_schema(&self) -> &Arc<RowSchema> {
        self.assembler.output_schema()
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }

    pub fn stats(&self) -> OperatorStats {
        self.stats
    }

    /// The built index, once the build phase has completed
    pub fn index(&self) -> Option<&Arc<LookupIndex>> {
        self.index.as_ref()
    }

    /// Drain `lookup` into the index. Runs once: later calls return the
    /// index built the first time without reading from `lookup`.
    ///
    /// Returns `Ok(None)` if cancellation fired first; the operator is then
    /// closed.
    pub async fn build_index(
        &mut self,
        lookup: &mut RowReceiver,
        cancel: &mut CancelToken,
    ) -> Result<Option<Arc<LookupIndex>>> {
        if let Some(index) = &self.index {
            return Ok(Some(Arc::clone(index)));
        }
        if self.state == OperatorState::Closed {
            return Ok(None);
        }
        if **lookup.schema() != *self.lookup_schema {
            return Err(ConfigError::SchemaMismatch(Side::Lookup).into());
        }

        self.state = OperatorState::BuildingIndex;
        info!(field = %self.config.lookup_key_field, "Building lookup index");

        let mut builder = IndexBuilder::new(
            Arc::clone(&self.lookup_schema),
            &self.config.lookup_key_field,
            self.config.case_sensitive,
        )?;

        loop {
            if cancel.is_cancelled() {
                self.abort();
                return Ok(None);
            }
            let row = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.abort();
                    return Ok(None);
                }
                row = lookup.recv() => row,
            };
            match row {
                Some(row) => builder.push_or_report(row, self.errors.as_ref()),
                None => break,
            }
        }

        let (index, build) = builder.finish();
        self.stats.lookup_rows_read = build.rows_read;
        self.stats.lookup_rows_skipped = build.null_keys + build.decode_errors;
        self.stats.row_errors += build.decode_errors;
        self.stats.index_size = index.len();

        info!(
            entries = index.len(),
            rows_read = build.rows_read,
            null_keys = build.null_keys,
            decode_errors = build.decode_errors,
            "Lookup index built"
        );

        let index = Arc::new(index);
        self.index = Some(Arc::clone(&index));
        self.state = OperatorState::Ready;
        Ok(Some(index))
    }

    /// Resolve and assemble one main row against the built index.
    ///
    /// A key that cannot be decoded yields an unmatched row and a row-level
    /// error; it never fails the stream.
    pub fn process_row(&mut self, row: &Row) -> Result<Row> {
        let index = self.index.as_ref().ok_or(OperatorError::IndexNotBuilt)?;
        self.stats.main_rows_read += 1;

        let result = match self.resolver.resolve(row, index) {
            Ok(result) => result,
            Err(e) => {
                self.stats.row_errors += 1;
                match &self.errors {
                    Some(tx) => {
                        if tx.send(RowError::decode(Side::Main, row.clone(), &e)).is_err() {
                            warn!(error = %e, "Error channel closed; main row left unmatched");
                        }
                    }
                    None => warn!(error = %e, "Main row key could not be decoded; left unmatched"),
                }
                MatchResult::unmatched()
            }
        };

        if result.is_match() {
            self.stats.rows_matched += 1;
        }
        Ok(self.assembler.assemble(row, &result))
    }

    /// Run both phases to completion.
    ///
    /// Output end-of-stream is signalled by dropping `output` when this
    /// returns; other clones of the sender keep the stream open.
    pub async fn run(
        &mut self,
        mut main: RowReceiver,
        mut lookup: RowReceiver,
        output: RowSender,
        mut cancel: CancelToken,
    ) -> Result<OperatorStats> {
        if **main.schema() != *self.main_schema {
            return Err(ConfigError::SchemaMismatch(Side::Main).into());
        }
        if **output.schema() != **self.output_schema() {
            warn!("Output channel schema differs from the operator's output layout");
        }

        if self.build_index(&mut lookup, &mut cancel).await?.is_none() {
            return Ok(self.finish_cancelled());
        }
        // Nothing more is read from the lookup side
        drop(lookup);

        loop {
            if cancel.is_cancelled() {
                return Ok(self.finish_cancelled());
            }
            let row = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.finish_cancelled()),
                row = main.recv() => row,
            };
            let Some(row) = row else {
                break;
            };

            self.state = OperatorState::Resolving;
            let out = self.process_row(&row)?;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.finish_cancelled()),
                sent = output.send(out) => {
                    if sent.is_err() {
                        self.close();
                        return Err(OperatorError::OutputClosed);
                    }
                }
            }
            self.stats.rows_emitted += 1;
            self.state = OperatorState::Ready;
        }

        self.state = OperatorState::Draining;
        drop(output);

        info!(
            main_rows = self.stats.main_rows_read,
            matched = self.stats.rows_matched,
            emitted = self.stats.rows_emitted,
            row_errors = self.stats.row_errors,
            "Fuzzy match complete"
        );
        Ok(self.stats)
    }

    fn finish_cancelled(&mut self) -> OperatorStats {
        self.abort();
        info!(
            main_rows = self.stats.main_rows_read,
            emitted = self.stats.rows_emitted,
            "Fuzzy match cancelled"
        );
        self.stats
    }

    fn abort(&mut self) {
        self.close();
        self.stats.cancelled = true;
    }

    fn close(&mut self) {
        self.index = None;
        self.state = OperatorState::Closed;
    }
}
