//! Batch response state machine.
//!
//! Reads the responses of a submitted batch in either [`BatchMode`]. The
//! machine knows how many statements and Sync points were sent, so it can tell
//! which ReadyForQuery ends which statement and when the connection is back at
//! a Sync boundary.
//!
//! Drivers hand it a [`Goal`] through [`start`](BatchReadStateMachine::start)
//! and then feed it messages through [`step`](BatchReadStateMachine::step)
//! until it returns [`Action::Finished`] or an error.

use std::sync::Arc;

use crate::command_tag::CommandTag;
use crate::error::{Error, Result};
use crate::opts::BatchMode;
use crate::protocol::backend::RawMessage;
use crate::protocol::types::TransactionStatus;
use crate::row::Column;

use super::action::{Action, Output, ResultKind};
use super::response::{Response, ResponseDecoder};

/// What the driver wants from the next messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Begin the next statement's result.
    StartResult,
    /// Read one row of the current result.
    NextRow,
    /// Read the current result to its completion tag, discarding rows.
    Finish,
    /// Read everything up to the final ReadyForQuery.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Between results.
    Idle,
    /// Result started, waiting for RowDescription or NoData.
    Describing,
    /// Reading rows until completion.
    Rows,
    /// Pipeline only: an error arrived, reading through the statement's Sync.
    Syncing,
}

/// State machine for reading back one submitted batch.
pub struct BatchReadStateMachine {
    mode: BatchMode,
    decoder: ResponseDecoder,
    goal: Goal,
    phase: Phase,
    /// Statements whose result has not been started
    remaining: usize,
    /// ReadyForQuery messages still owed by the server
    syncs: usize,
    /// Pipeline only: completed statements whose ReadyForQuery is unread
    trailing: usize,
    columns: Option<Arc<[Column]>>,
    command_tag: Option<CommandTag>,
    pending_error: Option<Error>,
    first_error: Option<Error>,
    broken: bool,
    transaction_status: TransactionStatus,
}

impl BatchReadStateMachine {
    /// Create a machine for a batch of `items` statements written in `mode`.
    pub fn new(mode: BatchMode, items: usize) -> Self {
        let syncs = match (mode, items) {
            (_, 0) => 0,
            (BatchMode::Simple, _) => 1,
            (BatchMode::Pipeline, n) => n,
        };
        Self {
            mode,
            decoder: ResponseDecoder::new(),
            goal: Goal::StartResult,
            phase: Phase::Idle,
            remaining: items,
            syncs,
            trailing: 0,
            columns: None,
            command_tag: None,
            pending_error: None,
            first_error: None,
            broken: false,
            transaction_status: TransactionStatus::Idle,
        }
    }

    /// Start from the connection's current transaction status.
    pub fn with_transaction_status(mut self, status: TransactionStatus) -> Self {
        self.transaction_status = status;
        self
    }

    /// Transaction status from the last ReadyForQuery read.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// Whether the message stream can no longer be followed.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Whether every response has been read and the connection is idle.
    pub fn is_finished(&self) -> bool {
        self.syncs == 0 && !self.broken
    }

    /// Columns of the current result.
    pub fn columns(&self) -> Option<&Arc<[Column]>> {
        self.columns.as_ref()
    }

    /// Give up on the message stream, e.g. after an I/O failure.
    pub fn mark_broken(&mut self, err: Error) -> Error {
        if !self.broken {
            tracing::warn!("batch response stream broken: {}", err);
        }
        self.broken = true;
        if self.first_error.is_none() {
            self.first_error = Some(err.clone());
        }
        err
    }

    /// Begin a goal. May finish immediately without reading.
    pub fn start(&mut self, goal: Goal) -> Result<Action> {
        if self.broken {
            return Err(match goal {
                Goal::Close => self.first_error.clone().unwrap_or(Error::ConnectionBroken),
                _ => Error::ConnectionBroken,
            });
        }
        self.goal = goal;
        match (goal, self.phase) {
            (Goal::Close, _) => self.continue_close(),
            (Goal::StartResult, Phase::Idle) => Ok(self.begin_result()),
            (Goal::NextRow, Phase::Idle) => Ok(Action::Finished(Output::EndOfRows)),
            (Goal::Finish, Phase::Idle) => Ok(Action::Finished(Output::Complete(
                self.command_tag.clone().unwrap_or_default(),
            ))),
            _ => Ok(Action::ReadMessage),
        }
    }

    /// Process one backend message toward the current goal.
    pub fn step(&mut self, msg: RawMessage<'_>) -> Result<Action> {
        let response = match self.decoder.decode(msg) {
            Ok(response) => response,
            Err(err) => return Err(self.mark_broken(err)),
        };
        match response {
            Response::Skip => Ok(Action::ReadMessage),
            Response::Described(columns) => self.on_described(columns),
            Response::Row(row) => {
                if self.phase != Phase::Rows {
                    return Err(self.unexpected("DataRow"));
                }
                match self.goal {
                    Goal::NextRow => Ok(Action::Finished(Output::Row(row))),
                    _ => Ok(Action::ReadMessage),
                }
            }
            Response::Complete(tag) => self.on_complete(tag),
            Response::CopyIn => self.on_copy(ResultKind::CopyIn, "CopyIn"),
            Response::CopyOut => self.on_copy(ResultKind::CopyOut, "CopyOut"),
            Response::Error(fields) => self.on_error(Error::Server(fields)),
            Response::Ready(status) => self.on_ready(status),
        }
    }

    fn unexpected(&mut self, what: &str) -> Error {
        self.mark_broken(Error::Protocol(format!(
            "unexpected {} while reading batch results",
            what
        )))
    }

    fn begin_result(&mut self) -> Action {
        let aborted = self.mode == BatchMode::Simple && self.first_error.is_some();
        if aborted || self.remaining == 0 {
            return Action::Finished(Output::NoMoreResults);
        }
        self.remaining -= 1;
        self.phase = Phase::Describing;
        self.columns = None;
        self.command_tag = None;
        Action::ReadMessage
    }

    fn continue_close(&mut self) -> Result<Action> {
        if self.syncs > 0 {
            return Ok(Action::ReadMessage);
        }
        self.phase = Phase::Idle;
        self.remaining = 0;
        match &self.first_error {
            Some(err) => Err(err.clone()),
            None => Ok(Action::Finished(Output::Closed)),
        }
    }

    fn on_described(&mut self, columns: Option<Arc<[Column]>>) -> Result<Action> {
        match self.phase {
            Phase::Describing => {}
            // a statement the caller never retrieved
            Phase::Idle if self.goal == Goal::Close => {}
            _ => return Err(self.unexpected("RowDescription")),
        }
        self.phase = Phase::Rows;
        self.columns = columns.clone();
        match self.goal {
            Goal::StartResult => Ok(Action::Finished(Output::Result(ResultKind::Rows(columns)))),
            _ => Ok(Action::ReadMessage),
        }
    }

    fn on_complete(&mut self, tag: CommandTag) -> Result<Action> {
        if !matches!(self.phase, Phase::Describing | Phase::Rows) {
            return Err(self.unexpected("CommandComplete"));
        }
        self.phase = Phase::Idle;
        if self.mode == BatchMode::Pipeline {
            self.trailing += 1;
        }
        self.command_tag = Some(tag.clone());
        match self.goal {
            Goal::NextRow => Ok(Action::Finished(Output::EndOfRows)),
            Goal::Finish => Ok(Action::Finished(Output::Complete(tag))),
            // the previous result was abandoned unfinished
            Goal::StartResult => Ok(self.begin_result()),
            Goal::Close => self.continue_close(),
        }
    }

    fn on_copy(&mut self, kind: ResultKind, name: &'static str) -> Result<Action> {
        tracing::warn!("{} result in batch, connection must be discarded", name);
        if self.mode == BatchMode::Pipeline
            && self.goal == Goal::StartResult
            && self.phase == Phase::Describing
        {
            // Reported to the caller as a result kind; the COPY data is never drained.
            self.broken = true;
            return Ok(Action::Finished(Output::Result(kind)));
        }
        Err(self.mark_broken(Error::UnexpectedPipelineResult(name)))
    }

    fn on_error(&mut self, err: Error) -> Result<Action> {
        match self.mode {
            BatchMode::Simple => {
                // The server skips the rest of the batch up to the single Sync.
                if self.first_error.is_none() {
                    self.first_error = Some(err.clone());
                }
                self.phase = Phase::Idle;
                self.remaining = 0;
                match self.goal {
                    Goal::StartResult => Ok(Action::Finished(Output::NoMoreResults)),
                    Goal::Close => Ok(Action::ReadMessage),
                    Goal::NextRow | Goal::Finish => Err(err),
                }
            }
            BatchMode::Pipeline => {
                if self.phase == Phase::Syncing {
                    return Err(self.unexpected("ErrorResponse"));
                }
                self.phase = Phase::Syncing;
                self.pending_error = Some(err);
                Ok(Action::ReadMessage)
            }
        }
    }

    fn on_ready(&mut self, status: TransactionStatus) -> Result<Action> {
        self.transaction_status = status;
        if self.syncs == 0 {
            return Err(self.unexpected("ReadyForQuery"));
        }
        match self.mode {
            BatchMode::Simple => {
                if self.goal != Goal::Close {
                    return Err(self.unexpected("ReadyForQuery"));
                }
                self.syncs -= 1;
                self.phase = Phase::Idle;
                self.remaining = 0;
                self.continue_close()
            }
            BatchMode::Pipeline => {
                if self.phase == Phase::Syncing {
                    self.syncs -= 1;
                    self.phase = Phase::Idle;
                    let Some(err) = self.pending_error.take() else {
                        return Err(self.unexpected("ReadyForQuery"));
                    };
                    match self.goal {
                        Goal::Close => {
                            if self.first_error.is_none() {
                                self.first_error = Some(err);
                            }
                            self.continue_close()
                        }
                        _ => Err(err),
                    }
                } else if self.trailing > 0 {
                    self.syncs -= 1;
                    self.trailing -= 1;
                    match self.goal {
                        Goal::Close => self.continue_close(),
                        _ => Ok(Action::ReadMessage),
                    }
                } else {
                    Err(self.unexpected("ReadyForQuery"))
                }
            }
        }
    }
}
