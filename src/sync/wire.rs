//! Blocking transports reading a batch from the PostgreSQL byte stream.

use std::io::{Read, Write};

use crate::buffer_set::BufferSet;
use crate::command_tag::CommandTag;
use crate::error::{Error, Result};
use crate::protocol::backend::RawMessage;
use crate::protocol::types::TransactionStatus;
use crate::row::{Column, Row};
use crate::state::{Action, BatchReadStateMachine, Goal, Output, ResultKind};

use super::stream::{Stream, read_message_into};
use super::transport::{MultiResultReader, Pipeline, PipelineResult, ResultReader};

/// Connection parts lent to a running batch.
///
/// Dropping it before every response has been read flags the connection
/// broken.
pub(crate) struct Wire<'c, S: Read + Write> {
    stream: &'c mut Stream<S>,
    buffer_set: &'c mut BufferSet,
    transaction_status: &'c mut TransactionStatus,
    is_broken: &'c mut bool,
    machine: BatchReadStateMachine,
}

impl<'c, S: Read + Write> Wire<'c, S> {
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

    fn drive(&mut self, goal: Goal) -> Result<Output> {
        let result = self.drive_inner(goal);
        *self.transaction_status = self.machine.transaction_status();
        if self.machine.is_broken() {
            *self.is_broken = true;
        }
        result
    }

    fn drive_inner(&mut self, goal: Goal) -> Result<Output> {
        let mut action = self.machine.start(goal)?;
        loop {
            match action {
                Action::Finished(output) => return Ok(output),
                Action::ReadMessage => {
                    if let Err(err) = read_message_into(&mut *self.stream, &mut *self.buffer_set) {
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

    fn close(&mut self) -> Result<()> {
        match self.drive(Goal::Close)? {
            Output::Closed => Ok(()),
            other => Err(self.unexpected(&other)),
        }
    }
}

impl<S: Read + Write> Drop for Wire<'_, S> {
    fn drop(&mut self) {
        if !self.machine.is_finished() {
            tracing::warn!("batch dropped before its responses were read; connection is broken");
            *self.is_broken = true;
        }
    }
}

impl<S: Read + Write> ResultReader for Wire<'_, S> {
    fn fields(&self) -> Option<&[Column]> {
        self.machine.columns().map(|columns| &columns[..])
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        match self.drive(Goal::NextRow)? {
            Output::Row(row) => Ok(Some(row)),
            Output::EndOfRows => Ok(None),
            other => Err(self.unexpected(&other)),
        }
    }

    fn finish(&mut self) -> Result<CommandTag> {
        match self.drive(Goal::Finish)? {
            Output::Complete(tag) => Ok(tag),
            other => Err(self.unexpected(&other)),
        }
    }
}

/// Multi-result reader over a batch written with a single Sync.
pub struct WireMultiResultReader<'c, S: Read + Write> {
    wire: Wire<'c, S>,
}

impl<'c, S: Read + Write> WireMultiResultReader<'c, S> {
    pub(crate) fn new(wire: Wire<'c, S>) -> Self {
        Self { wire }
    }
}

impl<S: Read + Write> MultiResultReader for WireMultiResultReader<'_, S> {
    fn next_result(&mut self) -> bool {
        match self.wire.drive(Goal::StartResult) {
            Ok(Output::Result(ResultKind::Rows(_))) => true,
            Ok(Output::NoMoreResults) => false,
            Ok(other) => {
                self.wire.unexpected(&other);
                false
            }
            // kept by the state machine and returned from close
            Err(_) => false,
        }
    }

    fn result_reader(&mut self) -> &mut dyn ResultReader {
        &mut self.wire
    }

    fn close(&mut self) -> Result<()> {
        self.wire.close()
    }
}

/// Pipeline over a batch written with one Sync per statement.
pub struct WirePipeline<'c, S: Read + Write> {
    wire: Wire<'c, S>,
}

impl<'c, S: Read + Write> WirePipeline<'c, S> {
    pub(crate) fn new(wire: Wire<'c, S>) -> Self {
        Self { wire }
    }
}

impl<S: Read + Write> Pipeline for WirePipeline<'_, S> {
    fn get_results(&mut self) -> Result<Option<PipelineResult<'_>>> {
        match self.wire.drive(Goal::StartResult)? {
            Output::Result(ResultKind::Rows(_)) => Ok(Some(PipelineResult::Rows(&mut self.wire))),
            Output::Result(ResultKind::CopyIn) => Ok(Some(PipelineResult::CopyIn)),
            Output::Result(ResultKind::CopyOut) => Ok(Some(PipelineResult::CopyOut)),
            Output::NoMoreResults => Ok(None),
            other => Err(self.wire.unexpected(&other)),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.wire.close()
    }
}
