//! File-to-file fuzzy join
//!
//! Each stage runs on its own task and stages are connected by bounded row
//! channels:
//!
//! ```text
//! main.jsonl   -> reader --+
//!                          +-> FuzzyMatch -> writer -> output
//! lookup.jsonl -> reader --+
//! ```
//!
//! A reader that hits a malformed line cancels the whole pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fuzzyjoin_core::{
    cancel_signal, row_channel, AlgorithmCatalog, CancelHandle, CancelToken, FuzzyMatch,
    MatchConfig, OperatorStats, RowError, RowReceiver, RowSchema, RowSender,
};
use tokio::fs::File;
use tokio::io::{self, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::jsonl;

/// Default capacity of every row channel in the pipeline
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Where joined rows are written
#[derive(Debug, Clone, Default)]
pub enum Output {
    #[default]
    Stdout,
    File(PathBuf),
}

/// Result of a completed or cancelled join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSummary {
    pub stats: OperatorStats,
    pub rows_written: u64,
}

/// Read the operator configuration from a JSON file and validate it
pub async fn load_config(path: &Path) -> Result<MatchConfig> {
    let text = tokio::fs::read_to_string(path).await?;
    let config: MatchConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

type RowLines = LinesStream<BufReader<File>>;

/// A row file opened and positioned after its schema line
struct RowFile {
    path: String,
    schema: Arc<RowSchema>,
    lines: RowLines,
}

impl RowFile {
    async fn open(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let file = File::open(path).await?;
        let lines: Lines<BufReader<File>> = BufReader::new(file).lines();
        let mut lines = LinesStream::new(lines);

        let first = match lines.next().await {
            Some(line) => line?,
            None => return Err(Error::format(&display, 1, "missing schema line")),
        };
        let schema = jsonl::parse_schema(&first)
            .map_err(|e| Error::format(&display, 1, format!("invalid schema line: {e}")))?;

        Ok(Self {
            path: display,
            schema: Arc::new(schema),
            lines,
        })
    }

    /// Stream every row into `tx`; stops early when the receiver goes away
    async fn feed(mut self, tx: &RowSender) -> Result<u64> {
        let mut sent = 0;
        let mut line_no = 1;
        while let Some(line) = self.lines.next().await {
            line_no += 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row = jsonl::parse_row(&self.schema, &line)
                .map_err(|msg| Error::format(&self.path, line_no, msg))?;
            if tx.send(row).await.is_err() {
                debug!(path = %self.path, "Row channel closed; reader stopping");
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }
}

/// Joins a main and a lookup row file
pub struct Pipeline {
    config: MatchConfig,
    catalog: AlgorithmCatalog,
    channel_capacity: usize,
    cancel: CancelHandle,
    token: CancelToken,
}

impl Pipeline {
    pub fn new(config: MatchConfig) -> Self {
        let (cancel, token) = cancel_signal();
        Self {
            config,
            catalog: AlgorithmCatalog::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cancel,
            token,
        }
    }

    pub fn with_catalog(mut self, catalog: AlgorithmCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Handle that stops the running join
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub async fn run(self, main: &Path, lookup: &Path, output: Output) -> Result<JoinSummary> {
        let main = RowFile::open(main).await?;
        let lookup = RowFile::open(lookup).await?;

        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let op = FuzzyMatch::new(
            self.config,
            &self.catalog,
            Arc::clone(&main.schema),
            Arc::clone(&lookup.schema),
        )?
        .with_error_channel(err_tx);
        let output_schema = Arc::clone(op.output_schema());

        info!(
            main = %main.path,
            lookup = %lookup.path,
            algorithm = %op.config().algorithm,
            "Starting fuzzy join"
        );

        let capacity = self.channel_capacity;
        let (main_tx, main_rx) = row_channel(Arc::clone(&main.schema), capacity);
        let (lookup_tx, lookup_rx) = row_channel(Arc::clone(&lookup.schema), capacity);
        let (out_tx, out_rx) = row_channel(Arc::clone(&output_schema), capacity);

        let main_reader = spawn_reader(main, main_tx, self.cancel.clone());
        let lookup_reader = spawn_reader(lookup, lookup_tx, self.cancel.clone());
        let reporter = tokio::spawn(report_row_errors(err_rx));

        let token = self.token.clone();
        let operator = tokio::spawn(async move {
            let mut op = op;
            op.run(main_rx, lookup_rx, out_tx, token).await
        });

        let sink: Box<dyn AsyncWrite + Send + Unpin> = match &output {
            Output::Stdout => Box::new(io::stdout()),
            Output::File(path) => Box::new(File::create(path).await?),
        };
        let writer = tokio::spawn(write_rows(output_schema, out_rx, sink));

        // Reader and writer errors take precedence over the operator error
        // they cause
        let stats = operator.await?;
        let written = writer.await?;
        let main_rows = main_reader.await?;
        let lookup_rows = lookup_reader.await?;
        let reported = reporter.await?;

        main_rows?;
        lookup_rows?;
        let rows_written = written?;
        let stats = stats?;

        if stats.cancelled {
            warn!(rows_written, "Fuzzy join cancelled");
        } else {
            info!(
                rows_written,
                matched = stats.rows_matched,
                row_errors = reported,
                "Fuzzy join complete"
            );
        }
        Ok(JoinSummary {
            stats,
            rows_written,
        })
    }
}

fn spawn_reader(file: RowFile, tx: RowSender, cancel: CancelHandle) -> JoinHandle<Result<u64>> {
    tokio::spawn(async move {
        let result = file.feed(&tx).await;
        if let Err(e) = &result {
            warn!(error = %e, "Reader failed; cancelling join");
            cancel.cancel();
        }
        // End-of-stream only after a failure has cancelled the join
        drop(tx);
        result
    })
}

async fn report_row_errors(mut errors: mpsc::UnboundedReceiver<RowError>) -> u64 {
    let mut count = 0;
    while let Some(e) = errors.recv().await {
        count += 1;
        warn!(side = %e.side, field = %e.field, "{}", e.message);
    }
    count
}

async fn write_rows<W>(schema: Arc<RowSchema>, mut rows: RowReceiver, sink: W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut out = BufWriter::new(sink);
    let mut written = 0;

    out.write_all(jsonl::schema_line(&schema)?.as_bytes()).await?;
    out.write_all(b"\n").await?;

    while let Some(row) = rows.recv().await {
        let line = serde_json::to_vec(&jsonl::row_to_json(&row))?;
        out.write_all(&line).await?;
        out.write_all(b"\n").await?;
        written += 1;
    }
    out.flush().await?;
    Ok(written)
}
