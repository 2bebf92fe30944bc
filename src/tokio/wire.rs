//! Async transport reading a batch from the PostgreSQL byte stream.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::buffer_set::BufferSet;
use crate::command_tag::CommandTag;
use crate::error::{Error, Result};
use crate::protocol::backend::RawMessage;
use crate::protocol::types::TransactionStatus;
use crate::row::{Column, Row};
use crate::state::{Action, BatchReadStateMachine, Goal, Output, ResultKind};

use super::stream::{Stream, read_message_into};

/// Connection parts lent to a running batch.
///
/// Dropping it before every response has been read flags the connection
/// broken.
pub(crate) struct Wire<'c, S: AsyncRead + AsyncWrite + Unpin> {
    stream: &'c mut Stream<S>,
    buffer_set: &'c mut BufferSet,
    transaction_status: &'c mut TransactionStatus,
    is_broken: &'c mut bool,
    machine: BatchReadStateMachine,
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> Wire<'c, S> {
    pub(crate) fn new(
        stream: &'c mut Stream<S>,
        buffer_set: &'c mut BufferSet,
        transaction_status: &'c mut TransactionStatus,
        is_broken: &'c mut bool,
        machine: BatchReadStateMachine,
    ) -> Self {
        Self {
            stream,
            buffer_set,
            transaction_status,
            is_broken,
            machine,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.machine.is_finished()
    }

    pub(crate) fn fields(&self) -> Option<&[Column]> {
        self.machine.columns().map(|columns| &columns[..])
    }

    async fn drive(&mut self, goal: Goal) -> Result<Output> {
        let result = self.drive_inner(goal).await;
        *self.transaction_status = self.machine.transaction_status();
        if self.machine.is_broken() {
            *self.is_broken = true;
        }
        result
    }

    async fn drive_inner(&mut self, goal: Goal) -> Result<Output> {
        let mut action = self.machine.start(goal)?;
        loop {
            match action {
                Action::Finished(output) => return Ok(output),
                Action::ReadMessage => {
                    if let Err(err) =
                        read_message_into(&mut *self.stream, &mut *self.buffer_set).await
                    {
                        return Err(self.machine.mark_broken(err));
                    }
                    action = self.machine.step(RawMessage::new(
                        self.buffer_set.type_byte,
                        &self.buffer_set.read_buffer,
                    ))?;
                }
            }
        }
    }

    fn unexpected(&mut self, output: &Output) -> Error {
        let err = self
            .machine
            .mark_broken(Error::Protocol(format!("unexpected batch output: {:?}", output)));
        *self.is_broken = true;
        err
    }

    /// Advance to the next statement's result.
    ///
    /// `Ok(false)` once no result remains (or, for a simple batch, after the
    /// batch was aborted). Copy results are reported as errors.
    pub(crate) async fn start_result(&mut self) -> Result<bool> {
        match self.drive(Goal::StartResult).await? {
            Output::Result(ResultKind::Rows(_)) => Ok(true),
            Output::Result(ResultKind::CopyIn) => Err(unsupported("CopyIn")),
            Output::Result(ResultKind::CopyOut) => Err(unsupported("CopyOut")),
            Output::NoMoreResults => Ok(false),
            other => Err(self.unexpected(&other)),
        }
    }

    pub(crate) async fn next_row(&mut self) -> Result<Option<Row>> {
        match self.drive(Goal::NextRow).await? {
            Output::Row(row) => Ok(Some(row)),
            Output::EndOfRows => Ok(None),
            other => Err(self.unexpected(&other)),
        }
    }

    pub(crate) async fn finish(&mut self) -> Result<CommandTag> {
        match self.drive(Goal::Finish).await? {
            Output::Complete(tag) => Ok(tag),
            other => Err(self.unexpected(&other)),
        }
    }

    /// Read every pending response and return the first error.
    pub(crate) async fn close(&mut self) -> Result<()> {
        match self.drive(Goal::Close).await? {
            Output::Closed => Ok(()),
            other => Err(self.unexpected(&other)),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Drop for Wire<'_, S> {
    fn drop(&mut self) {
        if !self.machine.is_finished() {
            tracing::warn!("batch dropped before its responses were read; connection is broken");
            *self.is_broken = true;
        }
    }
}

fn unsupported(kind: &'static str) -> Error {
    tracing::warn!("unexpected {} result in pipelined batch", kind);
    Error::UnexpectedPipelineResult(kind)
}
