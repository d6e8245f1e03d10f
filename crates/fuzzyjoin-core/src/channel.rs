//! Bounded row channels and the cancellation signal
//!
//! A row channel is an ordered, bounded queue between two pipeline stages.
//! Both halves carry the stream's [`RowSchema`], so a consumer knows the row
//! layout before the first row arrives. End-of-stream is signalled by
//! dropping every [`RowSender`]; [`RowReceiver::recv`] then yields `None`.
//!
//! Receiving from an empty channel and sending to a full one suspend the
//! calling task without occupying a runtime worker thread.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::row::{Row, RowSchema};

/// The receiving side has gone away; the unsent row is returned
#[derive(Debug, Error)]
#[error("row channel closed")]
pub struct ChannelClosed(pub Row);

/// Create a bounded row channel carrying rows of `schema`.
///
/// A capacity of zero is rounded up to one.
pub fn row_channel(schema: Arc<RowSchema>, capacity: usize) -> (RowSender, RowReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        RowSender {
            tx,
            schema: Arc::clone(&schema),
        },
        RowReceiver { rx, schema },
    )
}

/// Producer half of a row channel
#[derive(Debug, Clone)]
pub struct RowSender {
    tx: mpsc::Sender<Row>,
    schema: Arc<RowSchema>,
}

impl RowSender {
    pub fn schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    /// Send a row, waiting while the channel is full
    pub async fn send(&self, row: Row) -> Result<(), ChannelClosed> {
        self.tx.send(row).await.map_err(|e| ChannelClosed(e.0))
    }
}

/// Consumer half of a row channel
#[derive(Debug)]
pub struct RowReceiver {
    rx: mpsc::Receiver<Row>,
    schema: Arc<RowSchema>,
}

impl RowReceiver {
    pub fn schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    /// Next row, or `None` at end-of-stream
    pub async fn recv(&mut self) -> Option<Row> {
        self.rx.recv().await
    }
}

/// Create a cancellation signal pair
pub fn cancel_signal() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// Fires the cancellation signal. Firing more than once has no further effect.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observes the cancellation signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        cancel_signal().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal fires. Never resolves if every handle was
    /// dropped without firing.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
