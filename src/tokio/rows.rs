//! Async row streams over one statement's result.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::command_tag::CommandTag;
use crate::conversion::FromRow;
use crate::error::{Error, Result};
use crate::row::{Column, Row};
use crate::state::QueryTrace;

use super::wire::Wire;

/// Rows of one batch statement, read lazily.
///
/// Call [`close`](Self::close) (or read to the end) before retrieving the
/// next statement. A stream dropped early cannot read in `Drop`: the next
/// call on the batch skips its unread rows, and only then is the statement
/// reported to the tracer with its completion tag or error.
pub struct RowStream<'b, 'c, S: AsyncRead + AsyncWrite + Unpin> {
    wire: Option<&'b mut Wire<'c, S>>,
    trace: Option<QueryTrace<'b>>,
    err_slot: Option<&'b mut Option<Error>>,
    /// Set on drop when the result was not read to the end
    unfinished: Option<&'b mut bool>,
    err: Option<Error>,
    command_tag: Option<CommandTag>,
    closed: bool,
}

impl<'b, 'c, S: AsyncRead + AsyncWrite + Unpin> RowStream<'b, 'c, S> {
    pub(crate) fn new(
        wire: &'b mut Wire<'c, S>,
        trace: Option<QueryTrace<'b>>,
        err_slot: Option<&'b mut Option<Error>>,
        unfinished: &'b mut bool,
    ) -> Self {
        Self {
            wire: Some(wire),
            trace,
            err_slot,
            unfinished: Some(unfinished),
            err: None,
            command_tag: None,
            closed: false,
        }
    }

    pub(crate) fn failed(err: Error) -> Self {
        Self {
            wire: None,
            trace: None,
            err_slot: None,
            unfinished: None,
            err: Some(err),
            command_tag: None,
            closed: true,
        }
    }

    /// Column descriptions, when the statement returns rows.
    pub fn fields(&self) -> Option<&[Column]> {
        self.wire.as_deref().and_then(Wire::fields)
    }

    /// The error the stream ended with.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Completion tag, available once the stream is closed.
    pub fn command_tag(&self) -> Option<&CommandTag> {
        self.command_tag.as_ref()
    }

    /// Whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read the next row. Returns `Ok(None)` and closes the stream at the end.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.closed {
            return match &self.err {
                Some(err) => Err(err.clone()),
                None => Ok(None),
            };
        }
        let Some(wire) = self.wire.as_deref_mut() else {
            return Ok(None);
        };
        match wire.next_row().await {
            Ok(Some(row)) => Ok(Some(row)),
            Ok(None) => {
                self.close_inner().await;
                match &self.err {
                    Some(err) => Err(err.clone()),
                    None => Ok(None),
                }
            }
            Err(err) => {
                self.err = Some(err.clone());
                self.close_inner().await;
                Err(err)
            }
        }
    }

    /// Read and decode every remaining row.
    pub async fn collect<T: FromRow>(&mut self) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(T::from_row(&row)?);
        }
        Ok(rows)
    }

    /// Close the stream, discarding unread rows, and return the completion tag.
    pub async fn close(&mut self) -> Result<CommandTag> {
        self.close_inner().await;
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(self.command_tag.clone().unwrap_or_default()),
        }
    }

    async fn close_inner(&mut self) {
        if self.closed {
            return;
        }
        if self.err.is_none()
            && let Some(wire) = self.wire.as_deref_mut()
        {
            match wire.finish().await {
                Ok(tag) => self.command_tag = Some(tag),
                Err(err) => self.err = Some(err),
            }
        }
        self.closed = true;
        self.report();
    }

    fn report(&mut self) {
        if let (Some(slot), Some(err)) = (self.err_slot.as_deref_mut(), &self.err) {
            *slot = Some(err.clone());
        }
        if let Some(trace) = self.trace.take() {
            trace.emit(self.command_tag.as_ref(), self.err.as_ref());
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Drop for RowStream<'_, '_, S> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::debug!("row stream dropped before close");
            self.closed = true;
            if let Some(unfinished) = self.unfinished.take() {
                *unfinished = true;
            }
        }
    }
}

/// The first row of one batch statement.
pub struct BatchRow<'b, 'c, S: AsyncRead + AsyncWrite + Unpin> {
    rows: RowStream<'b, 'c, S>,
}

impl<'b, 'c, S: AsyncRead + AsyncWrite + Unpin> BatchRow<'b, 'c, S> {
    pub(crate) fn new(rows: RowStream<'b, 'c, S>) -> Self {
        Self { rows }
    }

    /// Decode the first row.
    ///
    /// Returns [`Error::NoRows`] if the result is empty. Further rows are
    /// read and discarded.
    pub async fn scan<T: FromRow>(mut self) -> Result<T> {
        let row = match self.rows.next_row().await? {
            Some(row) => row,
            None => return Err(Error::NoRows),
        };
        let decoded = T::from_row(&row);
        self.rows.close().await?;
        decoded
    }
}
