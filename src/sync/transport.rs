//! Transport seams for blocking batch results.
//!
//! [`BatchResults`](super::BatchResults) only talks to the connection through
//! these traits. The wire implementations live in `wire.rs`; tests and custom
//! transports can supply their own.

use crate::command_tag::CommandTag;
use crate::error::Result;
use crate::row::{Column, Row};

/// One statement's result: rows (possibly none) and a completion tag.
pub trait ResultReader {
    /// Column descriptions, or `None` if the statement returns no rows.
    fn fields(&self) -> Option<&[Column]>;

    /// Read the next row; `Ok(None)` once the rows are exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Read the result to its end, discarding unread rows, and return the
    /// completion tag.
    fn finish(&mut self) -> Result<CommandTag>;
}

/// Results of a batch sent as one combined exchange.
pub trait MultiResultReader {
    /// Advance to the next result. `false` when none remains or the batch
    /// failed; the reason is returned by [`close`](Self::close).
    fn next_result(&mut self) -> bool;

    /// The result most recently advanced to.
    fn result_reader(&mut self) -> &mut dyn ResultReader;

    /// Read the remaining responses and return the first unread error.
    ///
    /// Calling `close` again returns the same outcome without further I/O.
    fn close(&mut self) -> Result<()>;
}

/// A result retrieved from a [`Pipeline`].
pub enum PipelineResult<'a> {
    /// Rows and a completion tag.
    Rows(&'a mut dyn ResultReader),
    /// The statement entered COPY FROM STDIN.
    CopyIn,
    /// The statement entered COPY TO STDOUT.
    CopyOut,
}

impl PipelineResult<'_> {
    /// Name of the result kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineResult::Rows(_) => "Rows",
            PipelineResult::CopyIn => "CopyIn",
            PipelineResult::CopyOut => "CopyOut",
        }
    }
}

/// Results of a batch sent as one exchange per statement.
pub trait Pipeline {
    /// Retrieve the next statement's result; `None` if nothing is pending.
    fn get_results(&mut self) -> Result<Option<PipelineResult<'_>>>;

    /// Read every pending response and return the first error among them.
    ///
    /// Calling `close` again returns the same outcome without further I/O.
    fn close(&mut self) -> Result<()>;
}
