//! Batch result cursor.
//!
//! Tracks which queued statement comes next, the sticky batch state and the
//! one-shot end-of-batch trace. It performs no I/O; the blocking and tokio
//! batch results drive it around their transports.

use std::sync::Arc;

use crate::batch::{Batch, BatchItem};
use crate::command_tag::CommandTag;
use crate::error::{Error, Result};
use crate::trace::{BatchTracer, TraceBatchEndData, TraceBatchQueryData};

/// Lifecycle of a batch as seen by its caller.
///
/// Transitions only go forward: `Open -> Errored`, `Open | Errored -> Closed`.
#[derive(Debug, Clone, Default)]
pub enum BatchState {
    /// Results can still be retrieved.
    #[default]
    Open,
    /// A fatal error occurred; every later call returns it.
    Errored(Error),
    /// `close` has run, keeping the first error of the batch if there was one.
    Closed(Option<Error>),
}

/// A pending trace event for one statement, emitted by its row stream.
#[derive(Clone, Copy)]
pub struct QueryTrace<'a> {
    tracer: &'a Arc<dyn BatchTracer>,
    item: &'a BatchItem,
}

impl QueryTrace<'_> {
    /// Report the statement's outcome.
    pub fn emit(self, command_tag: Option<&CommandTag>, err: Option<&Error>) {
        self.tracer.trace_batch_query(TraceBatchQueryData {
            sql: &self.item.query,
            args: &self.item.arguments,
            command_tag,
            err,
        });
    }
}

/// Position and state of a batch being read back.
pub struct BatchCursor {
    batch: Batch,
    ix: usize,
    state: BatchState,
    end_traced: bool,
    tracer: Option<Arc<dyn BatchTracer>>,
}

impl BatchCursor {
    /// Start reading back a submitted batch.
    pub fn new(batch: Batch, tracer: Option<Arc<dyn BatchTracer>>) -> Self {
        Self {
            batch,
            ix: 0,
            state: BatchState::Open,
            end_traced: false,
            tracer,
        }
    }

    /// Current state.
    pub fn state(&self) -> &BatchState {
        &self.state
    }

    /// The stored error, if the batch failed.
    pub fn error(&self) -> Option<&Error> {
        match &self.state {
            BatchState::Errored(err) | BatchState::Closed(Some(err)) => Some(err),
            BatchState::Open | BatchState::Closed(None) => None,
        }
    }

    /// Whether `close` has already run.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, BatchState::Closed(_))
    }

    /// Whether results can be retrieved.
    ///
    /// A stored error takes precedence over the closed state.
    pub fn check(&self) -> Result<()> {
        match &self.state {
            BatchState::Open => Ok(()),
            BatchState::Errored(err) | BatchState::Closed(Some(err)) => Err(err.clone()),
            BatchState::Closed(None) => Err(Error::BatchClosed),
        }
    }

    /// Take the next queued statement, advancing the cursor.
    ///
    /// Returns `None` once every statement has been handed out.
    pub fn next_item(&mut self) -> Option<usize> {
        if self.ix < self.batch.len() {
            self.ix += 1;
            Some(self.ix - 1)
        } else {
            None
        }
    }

    /// A queued statement by index.
    pub fn item(&self, idx: usize) -> Option<&BatchItem> {
        self.batch.items().get(idx)
    }

    /// Number of statements handed out so far.
    pub fn position(&self) -> usize {
        self.ix
    }

    /// Number of queued statements.
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    /// Whether the batch has no statements.
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// The attached tracer.
    pub fn tracer(&self) -> Option<&Arc<dyn BatchTracer>> {
        self.tracer.as_ref()
    }

    /// Record a fatal error and return the error the batch now carries.
    ///
    /// The first error wins; recording on an errored or closed batch keeps
    /// the stored one.
    pub fn fail(&mut self, err: Error) -> Error {
        match &self.state {
            BatchState::Open => {
                self.state = BatchState::Errored(err.clone());
                err
            }
            BatchState::Errored(stored) | BatchState::Closed(Some(stored)) => stored.clone(),
            BatchState::Closed(None) => err,
        }
    }

    /// Report the outcome of one statement to the tracer.
    pub fn trace_query(&self, idx: usize, command_tag: Option<&CommandTag>, err: Option<&Error>) {
        if let Some(trace) = self.query_trace(idx) {
            trace.emit(command_tag, err);
        }
    }

    /// Hand the trace event of one statement to whoever finishes reading it.
    pub fn query_trace(&self, idx: usize) -> Option<QueryTrace<'_>> {
        Some(QueryTrace {
            tracer: self.tracer.as_ref()?,
            item: self.item(idx)?,
        })
    }

    /// Whether statements remain that the tracer has not seen.
    pub fn has_untraced(&self) -> bool {
        self.tracer.is_some() && self.ix < self.batch.len() && !self.is_closed()
    }

    /// Report every remaining statement with the stored error, without
    /// touching the transport.
    pub fn trace_remaining_failed(&mut self) {
        let Some(err) = self.error().cloned() else {
            return;
        };
        while let Some(idx) = self.next_item() {
            self.trace_query(idx, None, Some(&err));
        }
    }

    /// Fire the end-of-batch event, at most once.
    pub fn trace_end(&mut self) {
        if self.end_traced {
            return;
        }
        self.end_traced = true;
        if let Some(tracer) = &self.tracer {
            let err = match &self.state {
                BatchState::Errored(err) | BatchState::Closed(Some(err)) => Some(err),
                BatchState::Open | BatchState::Closed(None) => None,
            };
            tracer.trace_batch_end(TraceBatchEndData { err });
        }
    }

    /// Outcome of a repeated `close`, or `None` if the batch is not closed yet.
    pub fn closed_outcome(&self) -> Option<Result<()>> {
        match &self.state {
            BatchState::Closed(None) => Some(Ok(())),
            BatchState::Closed(Some(err)) => Some(Err(err.clone())),
            BatchState::Open | BatchState::Errored(_) => None,
        }
    }

    /// Move to `Closed`, folding in the transport's close result.
    ///
    /// An error stored earlier wins over a close error.
    pub fn finish_close(&mut self, close_result: Result<()>) -> Result<()> {
        let err = match std::mem::take(&mut self.state) {
            BatchState::Errored(err) | BatchState::Closed(Some(err)) => Some(err),
            BatchState::Open | BatchState::Closed(None) => close_result.err(),
        };
        self.state = BatchState::Closed(err.clone());
        self.trace_end();
        match err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
