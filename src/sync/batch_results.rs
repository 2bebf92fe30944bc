//! Blocking batch results.

use std::sync::Arc;

use crate::batch::Batch;
use crate::command_tag::CommandTag;
use crate::error::{Error, Result};
use crate::state::{BatchCursor, BatchState};
use crate::trace::BatchTracer;

use super::rows::{BatchRow, RowStream};
use super::transport::{MultiResultReader, Pipeline, PipelineResult};

/// Results of a submitted batch, retrieved in submission order.
///
/// The variant is chosen once when the batch is sent. Call
/// [`exec`](Self::exec), [`query`](Self::query) or
/// [`query_row`](Self::query_row) once per queued statement, then
/// [`close`](Self::close). Dropping the results closes them.
///
/// The first error is sticky: every later call returns it.
pub enum BatchResults<'c> {
    /// All statements sent as one exchange ending in a single Sync.
    Simple(SimpleBatchResults<'c>),
    /// One exchange per statement.
    Pipelined(PipelineBatchResults<'c>),
}

impl<'c> BatchResults<'c> {
    /// Read `batch` back through a multi-result reader.
    pub fn simple(
        batch: Batch,
        tracer: Option<Arc<dyn BatchTracer>>,
        reader: impl MultiResultReader + 'c,
    ) -> Self {
        BatchResults::Simple(SimpleBatchResults {
            cursor: BatchCursor::new(batch, tracer),
            reader: Box::new(reader),
        })
    }

    /// Read `batch` back through a pipeline.
    pub fn pipelined(
        batch: Batch,
        tracer: Option<Arc<dyn BatchTracer>>,
        pipeline: impl Pipeline + 'c,
    ) -> Self {
        BatchResults::Pipelined(PipelineBatchResults {
            cursor: BatchCursor::new(batch, tracer),
            pipeline: Box::new(pipeline),
            last_rows_err: None,
        })
    }

    /// Read the next statement's result as a completion tag, ignoring rows.
    pub fn exec(&mut self) -> Result<CommandTag> {
        match self {
            BatchResults::Simple(results) => results.exec(),
            BatchResults::Pipelined(results) => results.exec(),
        }
    }

    /// Read the next statement's result as a row stream.
    pub fn query(&mut self) -> Result<RowStream<'_>> {
        let rows = self.query_stream();
        if let Some(err) = rows.err().cloned() {
            return Err(err);
        }
        Ok(rows)
    }

    /// Read the first row of the next statement's result.
    ///
    /// Errors are reported by [`BatchRow::scan`].
    pub fn query_row(&mut self) -> BatchRow<'_> {
        BatchRow::new(self.query_stream())
    }

    /// Finish the batch and return its first error.
    ///
    /// Statements not yet retrieved are read (and traced) first. Calling
    /// `close` again returns the same outcome.
    pub fn close(&mut self) -> Result<()> {
        match self {
            BatchResults::Simple(results) => results.close(),
            BatchResults::Pipelined(results) => results.close(),
        }
    }

    /// Current batch state.
    pub fn state(&self) -> &BatchState {
        match self {
            BatchResults::Simple(results) => results.cursor.state(),
            BatchResults::Pipelined(results) => results.cursor.state(),
        }
    }

    fn query_stream(&mut self) -> RowStream<'_> {
        match self {
            BatchResults::Simple(results) => results.query_stream(),
            BatchResults::Pipelined(results) => results.query_stream(),
        }
    }
}

/// Batch results read from a [`MultiResultReader`].
pub struct SimpleBatchResults<'c> {
    cursor: BatchCursor,
    reader: Box<dyn MultiResultReader + 'c>,
}

impl SimpleBatchResults<'_> {
    /// Close the reader after it ran out of results and pick the error to report.
    fn exhausted(&mut self, idx: Option<usize>) -> Error {
        let err = match self.reader.close() {
            Err(err) => err,
            Ok(()) => Error::NoResult,
        };
        let err = self.cursor.fail(err);
        if let Some(idx) = idx {
            self.cursor.trace_query(idx, None, Some(&err));
        }
        err
    }

    fn exec(&mut self) -> Result<CommandTag> {
        self.cursor.check()?;
        let idx = self.cursor.next_item();
        if !self.reader.next_result() {
            return Err(self.exhausted(idx));
        }
        match self.reader.result_reader().finish() {
            Ok(tag) => {
                if let Some(idx) = idx {
                    self.cursor.trace_query(idx, Some(&tag), None);
                }
                Ok(tag)
            }
            Err(err) => {
                let err = self.cursor.fail(err);
                if let Some(idx) = idx {
                    self.cursor.trace_query(idx, None, Some(&err));
                }
                Err(err)
            }
        }
    }

    fn query_stream(&mut self) -> RowStream<'_> {
        if let Err(err) = self.cursor.check() {
            return RowStream::failed(err);
        }
        let idx = self.cursor.next_item();
        if !self.reader.next_result() {
            return RowStream::failed(self.exhausted(idx));
        }
        let trace = idx.and_then(|idx| self.cursor.query_trace(idx));
        RowStream::new(self.reader.result_reader(), trace, None)
    }

    /// Trace every statement the caller never retrieved.
    fn drain_untraced(&mut self) {
        while self.cursor.has_untraced() {
            if self.cursor.error().is_some() {
                self.cursor.trace_remaining_failed();
            } else {
                let _ = self.exec();
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(outcome) = self.cursor.closed_outcome() {
            return outcome;
        }
        self.drain_untraced();
        let closed = self.reader.close();
        tracing::debug!(statements = self.cursor.len(), ok = closed.is_ok(), "simple batch closed");
        self.cursor.finish_close(closed)
    }
}

impl Drop for SimpleBatchResults<'_> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Batch results read from a [`Pipeline`].
pub struct PipelineBatchResults<'c> {
    cursor: BatchCursor,
    pipeline: Box<dyn Pipeline + 'c>,
    last_rows_err: Option<Error>,
}

impl PipelineBatchResults<'_> {
    /// An erred previous row stream fails the batch without touching the pipeline.
    fn check(&mut self) -> Result<()> {
        self.cursor.check()?;
        if let Some(err) = self.last_rows_err.take() {
            return Err(self.cursor.fail(err));
        }
        Ok(())
    }

    fn exec(&mut self) -> Result<CommandTag> {
        self.check()?;
        let idx = self.cursor.next_item();
        let result = match self.pipeline.get_results() {
            Ok(Some(PipelineResult::Rows(reader))) => reader.finish(),
            Ok(Some(other)) => Err(unsupported(&other)),
            Ok(None) => Err(Error::NoResult),
            Err(err) => Err(err),
        };
        match result {
            Ok(tag) => {
                if let Some(idx) = idx {
                    self.cursor.trace_query(idx, Some(&tag), None);
                }
                Ok(tag)
            }
            Err(err) => {
                let err = self.cursor.fail(err);
                if let Some(idx) = idx {
                    self.cursor.trace_query(idx, None, Some(&err));
                }
                Err(err)
            }
        }
    }

    fn query_stream(&mut self) -> RowStream<'_> {
        if let Err(err) = self.check() {
            return RowStream::failed(err);
        }
        let idx = self.cursor.next_item();
        let Self {
            cursor,
            pipeline,
            last_rows_err,
        } = self;
        let err = match pipeline.get_results() {
            Ok(Some(PipelineResult::Rows(reader))) => {
                let trace = idx.and_then(|idx| cursor.query_trace(idx));
                return RowStream::new(reader, trace, Some(last_rows_err));
            }
            Ok(Some(other)) => unsupported(&other),
            Ok(None) => Error::NoResult,
            Err(err) => err,
        };
        let err = cursor.fail(err);
        if let Some(idx) = idx {
            cursor.trace_query(idx, None, Some(&err));
        }
        RowStream::failed(err)
    }

    /// Trace every statement the caller never retrieved.
    fn drain_untraced(&mut self) {
        while self.cursor.has_untraced() {
            if self.cursor.error().is_some() {
                self.cursor.trace_remaining_failed();
            } else {
                let _ = self.exec();
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(outcome) = self.cursor.closed_outcome() {
            return outcome;
        }
        if let Some(err) = self.last_rows_err.take() {
            self.cursor.fail(err);
        }
        self.drain_untraced();
        let closed = self.pipeline.close();
        tracing::debug!(statements = self.cursor.len(), ok = closed.is_ok(), "pipelined batch closed");
        self.cursor.finish_close(closed)
    }
}

impl Drop for PipelineBatchResults<'_> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn unsupported(result: &PipelineResult<'_>) -> Error {
    tracing::warn!("unexpected {} result in pipelined batch", result.kind());
    Error::UnexpectedPipelineResult(result.kind())
}
