//! Row streams over one statement's result.

use crate::command_tag::CommandTag;
use crate::conversion::FromRow;
use crate::error::{Error, Result};
use crate::row::{Column, Row};
use crate::state::QueryTrace;

use super::transport::ResultReader;

/// Rows of one batch statement, read lazily.
///
/// The stream borrows its [`BatchResults`](super::BatchResults), so the next
/// statement can only be retrieved once the stream is gone. Closing or
/// dropping the stream reads the rest of the result and reports the statement
/// to the batch tracer.
pub struct RowStream<'b> {
    reader: Option<&'b mut dyn ResultReader>,
    trace: Option<QueryTrace<'b>>,
    err_slot: Option<&'b mut Option<Error>>,
    err: Option<Error>,
    command_tag: Option<CommandTag>,
    closed: bool,
}

impl<'b> RowStream<'b> {
    pub(crate) fn new(
        reader: &'b mut dyn ResultReader,
        trace: Option<QueryTrace<'b>>,
        err_slot: Option<&'b mut Option<Error>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            trace,
            err_slot,
            err: None,
            command_tag: None,
            closed: false,
        }
    }

    /// A stream that is already closed and carries `err`.
    pub(crate) fn failed(err: Error) -> Self {
        Self {
            reader: None,
            trace: None,
            err_slot: None,
            err: Some(err),
            command_tag: None,
            closed: true,
        }
    }

    /// Column descriptions, when the statement returns rows.
    pub fn fields(&self) -> Option<&[Column]> {
        self.reader.as_deref().and_then(|reader| reader.fields())
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
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        if self.closed {
            return match &self.err {
                Some(err) => Err(err.clone()),
                None => Ok(None),
            };
        }
        let Some(reader) = self.reader.as_deref_mut() else {
            return Ok(None);
        };
        match reader.next_row() {
            Ok(Some(row)) => Ok(Some(row)),
            Ok(None) => {
                self.close_inner();
                match &self.err {
                    Some(err) => Err(err.clone()),
                    None => Ok(None),
                }
            }
            Err(err) => {
                self.err = Some(err.clone());
                self.close_inner();
                Err(err)
            }
        }
    }

    /// Read and decode every remaining row.
    pub fn collect<T: FromRow>(&mut self) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(T::from_row(&row)?);
        }
        Ok(rows)
    }

    /// Close the stream, discarding unread rows, and return the completion tag.
    pub fn close(&mut self) -> Result<CommandTag> {
        self.close_inner();
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(self.command_tag.clone().unwrap_or_default()),
        }
    }

    fn close_inner(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.err.is_none()
            && let Some(reader) = self.reader.as_deref_mut()
        {
            match reader.finish() {
                Ok(tag) => self.command_tag = Some(tag),
                Err(err) => self.err = Some(err),
            }
        }
        if let (Some(slot), Some(err)) = (self.err_slot.as_deref_mut(), &self.err) {
            *slot = Some(err.clone());
        }
        if let Some(trace) = self.trace.take() {
            trace.emit(self.command_tag.as_ref(), self.err.as_ref());
        }
    }
}

impl Drop for RowStream<'_> {
    fn drop(&mut self) {
        self.close_inner();
    }
}

/// The first row of one batch statement.
pub struct BatchRow<'b> {
    rows: RowStream<'b>,
}

impl<'b> BatchRow<'b> {
    pub(crate) fn new(rows: RowStream<'b>) -> Self {
        Self { rows }
    }

    /// Decode the first row.
    ///
    /// Returns [`Error::NoRows`] if the result is empty. Further rows are
    /// read and discarded.
    pub fn scan<T: FromRow>(mut self) -> Result<T> {
        let row = match self.rows.next_row()? {
            Some(row) => row,
            None => return Err(Error::NoRows),
        };
        let decoded = T::from_row(&row);
        self.rows.close()?;
        decoded
    }
}
