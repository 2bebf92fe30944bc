//! Async batch results.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::batch::Batch;
use crate::command_tag::CommandTag;
use crate::error::{Error, Result};
use crate::opts::BatchMode;
use crate::state::{BatchCursor, BatchState};
use crate::trace::BatchTracer;

use super::rows::{BatchRow, RowStream};
use super::wire::Wire;

/// Results of a submitted batch, retrieved in submission order.
///
/// The variant is chosen once when the batch is sent. Call
/// [`exec`](Self::exec), [`query`](Self::query) or
/// [`query_row`](Self::query_row) once per queued statement, then
/// [`close`](Self::close). The first error is sticky.
///
/// Dropping the results without `close` cannot read the remaining responses:
/// the connection is flagged broken and the tracer sees the rest of the
/// batch fail with [`Error::ConnectionBroken`].
pub enum BatchResults<'c, S: AsyncRead + AsyncWrite + Unpin> {
    /// All statements sent as one exchange ending in a single Sync.
    Simple(SimpleBatchResults<'c, S>),
    /// One exchange per statement.
    Pipelined(PipelineBatchResults<'c, S>),
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> BatchResults<'c, S> {
    pub(crate) fn new(
        mode: BatchMode,
        batch: Batch,
        tracer: Option<Arc<dyn BatchTracer>>,
        wire: Wire<'c, S>,
    ) -> Self {
        let reader = Reader {
            cursor: BatchCursor::new(batch, tracer),
            wire,
            open_item: None,
            unfinished: false,
        };
        match mode {
            BatchMode::Simple => BatchResults::Simple(SimpleBatchResults { reader }),
            BatchMode::Pipeline => BatchResults::Pipelined(PipelineBatchResults {
                reader,
                last_rows_err: None,
            }),
        }
    }

    /// Current batch state.
    pub fn state(&self) -> &BatchState {
        match self {
            BatchResults::Simple(results) => results.reader.cursor.state(),
            BatchResults::Pipelined(results) => results.reader.cursor.state(),
        }
    }

    /// Read the next statement's result as a completion tag, ignoring rows.
    pub async fn exec(&mut self) -> Result<CommandTag> {
        match self {
            BatchResults::Simple(results) => results.exec().await,
            BatchResults::Pipelined(results) => results.exec().await,
        }
    }

    /// Read the next statement's result as a row stream.
    pub async fn query(&mut self) -> Result<RowStream<'_, 'c, S>> {
        let rows = self.query_stream().await;
        if let Some(err) = rows.err().cloned() {
            return Err(err);
        }
        Ok(rows)
    }

    /// Read the first row of the next statement's result.
    ///
    /// Errors are reported by [`BatchRow::scan`].
    pub async fn query_row(&mut self) -> BatchRow<'_, 'c, S> {
        BatchRow::new(self.query_stream().await)
    }

    /// Finish the batch and return its first error.
    ///
    /// Statements not yet retrieved are read (and traced) first. Calling
    /// `close` again returns the same outcome.
    pub async fn close(&mut self) -> Result<()> {
        match self {
            BatchResults::Simple(results) => results.close().await,
            BatchResults::Pipelined(results) => results.close().await,
        }
    }

    async fn query_stream(&mut self) -> RowStream<'_, 'c, S> {
        match self {
            BatchResults::Simple(results) => results.query_stream().await,
            BatchResults::Pipelined(results) => results.query_stream().await,
        }
    }
}

/// Cursor and wire shared by both strategies.
struct Reader<'c, S: AsyncRead + AsyncWrite + Unpin> {
    cursor: BatchCursor,
    wire: Wire<'c, S>,
    /// Item of the last row stream handed out
    open_item: Option<usize>,
    /// That stream was dropped before its result was read to the end
    unfinished: bool,
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> Reader<'c, S> {
    /// Read the rest of a dropped row stream's result and trace its item.
    ///
    /// Returns the error the statement ended with.
    async fn settle_unfinished(&mut self) -> Option<Error> {
        if !std::mem::take(&mut self.unfinished) {
            return None;
        }
        let (tag, err) = match self.wire.finish().await {
            Ok(tag) => (Some(tag), None),
            Err(err) => (None, Some(err)),
        };
        if let Some(idx) = self.open_item {
            self.cursor.trace_query(idx, tag.as_ref(), err.as_ref());
        }
        err
    }

    fn failed(&mut self, idx: Option<usize>, err: Error) -> Error {
        let err = self.cursor.fail(err);
        if let Some(idx) = idx {
            self.cursor.trace_query(idx, None, Some(&err));
        }
        err
    }

    fn record(&mut self, idx: Option<usize>, result: Result<CommandTag>) -> Result<CommandTag> {
        match result {
            Ok(tag) => {
                if let Some(idx) = idx {
                    self.cursor.trace_query(idx, Some(&tag), None);
                }
                Ok(tag)
            }
            Err(err) => Err(self.failed(idx, err)),
        }
    }

    fn rows<'b>(
        &'b mut self,
        idx: Option<usize>,
        err_slot: Option<&'b mut Option<Error>>,
    ) -> RowStream<'b, 'c, S> {
        self.open_item = idx;
        let Self {
            cursor,
            wire,
            unfinished,
            ..
        } = self;
        let trace = match idx {
            Some(idx) => cursor.query_trace(idx),
            None => None,
        };
        RowStream::new(wire, trace, err_slot, unfinished)
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self.wire.close().await;
        tracing::debug!(statements = self.cursor.len(), ok = closed.is_ok(), "batch closed");
        self.cursor.finish_close(closed)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Drop for Reader<'_, S> {
    fn drop(&mut self) {
        if self.cursor.is_closed() {
            return;
        }
        if !self.wire.is_finished() {
            self.cursor.fail(Error::ConnectionBroken);
        }
        if std::mem::take(&mut self.unfinished)
            && let (Some(idx), Some(err)) = (self.open_item, self.cursor.error().cloned())
        {
            self.cursor.trace_query(idx, None, Some(&err));
        }
        self.cursor.trace_remaining_failed();
        self.cursor.trace_end();
    }
}

/// Batch results of a [`BatchMode::Simple`] batch.
pub struct SimpleBatchResults<'c, S: AsyncRead + AsyncWrite + Unpin> {
    reader: Reader<'c, S>,
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> SimpleBatchResults<'c, S> {
    async fn start_result(&mut self) -> Result<()> {
        if self.reader.wire.start_result().await? {
            return Ok(());
        }
        // an aborted batch reports its error on close
        match self.reader.wire.close().await {
            Err(err) => Err(err),
            Ok(()) => Err(Error::NoResult),
        }
    }

    async fn check(&mut self) -> Result<()> {
        self.reader.cursor.check()?;
        // a failed statement aborts the batch; the wire reports it on close
        let _ = self.reader.settle_unfinished().await;
        Ok(())
    }

    async fn exec(&mut self) -> Result<CommandTag> {
        self.check().await?;
        let idx = self.reader.cursor.next_item();
        let result = match self.start_result().await {
            Ok(()) => self.reader.wire.finish().await,
            Err(err) => Err(err),
        };
        self.reader.record(idx, result)
    }

    async fn query_stream(&mut self) -> RowStream<'_, 'c, S> {
        if let Err(err) = self.check().await {
            return RowStream::failed(err);
        }
        let idx = self.reader.cursor.next_item();
        if let Err(err) = self.start_result().await {
            return RowStream::failed(self.reader.failed(idx, err));
        }
        self.reader.rows(idx, None)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(outcome) = self.reader.cursor.closed_outcome() {
            return outcome;
        }
        let _ = self.reader.settle_unfinished().await;
        while self.reader.cursor.has_untraced() {
            if self.reader.cursor.error().is_some() {
                self.reader.cursor.trace_remaining_failed();
            } else {
                let _ = self.exec().await;
            }
        }
        self.reader.close().await
    }
}

/// Batch results of a [`BatchMode::Pipeline`] batch.
pub struct PipelineBatchResults<'c, S: AsyncRead + AsyncWrite + Unpin> {
    reader: Reader<'c, S>,
    last_rows_err: Option<Error>,
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> PipelineBatchResults<'c, S> {
    /// An erred previous row stream fails the batch without reading further.
    async fn check(&mut self) -> Result<()> {
        self.reader.cursor.check()?;
        if let Some(err) = self.reader.settle_unfinished().await {
            self.last_rows_err.get_or_insert(err);
        }
        if let Some(err) = self.last_rows_err.take() {
            return Err(self.reader.cursor.fail(err));
        }
        Ok(())
    }

    async fn start_result(&mut self) -> Result<()> {
        if self.reader.wire.start_result().await? {
            Ok(())
        } else {
            Err(Error::NoResult)
        }
    }

    async fn exec(&mut self) -> Result<CommandTag> {
        self.check().await?;
        let idx = self.reader.cursor.next_item();
        let result = match self.start_result().await {
            Ok(()) => self.reader.wire.finish().await,
            Err(err) => Err(err),
        };
        self.reader.record(idx, result)
    }

    async fn query_stream(&mut self) -> RowStream<'_, 'c, S> {
        if let Err(err) = self.check().await {
            return RowStream::failed(err);
        }
        let idx = self.reader.cursor.next_item();
        if let Err(err) = self.start_result().await {
            return RowStream::failed(self.reader.failed(idx, err));
        }
        self.reader.rows(idx, Some(&mut self.last_rows_err))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(outcome) = self.reader.cursor.closed_outcome() {
            return outcome;
        }
        if let Some(err) = self.reader.settle_unfinished().await {
            self.reader.cursor.fail(err);
        }
        if let Some(err) = self.last_rows_err.take() {
            self.reader.cursor.fail(err);
        }
        while self.reader.cursor.has_untraced() {
            if self.reader.cursor.error().is_some() {
                self.reader.cursor.trace_remaining_failed();
            } else {
                let _ = self.exec().await;
            }
        }
        self.reader.close().await
    }
}
