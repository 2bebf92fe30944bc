//! Action types for state machine I/O requests.

use std::sync::Arc;

use crate::command_tag::CommandTag;
use crate::row::{Column, Row};

/// Action requested by a state machine.
///
/// The caller should perform the requested I/O and then call the
/// appropriate method to continue the state machine.
#[derive(Debug)]
pub enum Action {
    /// Read a PostgreSQL message from the server.
    ///
    /// The caller should:
    /// 1. Read the message type byte (1 byte)
    /// 2. Read the length (4 bytes, big-endian i32)
    /// 3. Read (length - 4) bytes of payload into the buffer set
    /// 4. Call the state machine's `step()` method with the message
    ReadMessage,

    /// The requested goal has been reached.
    Finished(Output),
}

/// Kind of result a statement produced.
#[derive(Debug, Clone)]
pub enum ResultKind {
    /// Rows (possibly none) followed by a completion tag.
    Rows(Option<Arc<[Column]>>),
    /// COPY FROM STDIN
    CopyIn,
    /// COPY TO STDOUT
    CopyOut,
}

/// Outcome of a goal handed to the batch read state machine.
#[derive(Debug)]
pub enum Output {
    /// The next statement's result has started.
    Result(ResultKind),
    /// No further results will be produced.
    NoMoreResults,
    /// One row of the current result.
    Row(Row),
    /// The current result has no more rows.
    EndOfRows,
    /// The current result completed with this tag.
    Complete(CommandTag),
    /// Every response of the batch has been read.
    Closed,
}
