//! Synchronous PostgreSQL connection.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::batch::Batch;
use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};
use crate::opts::{BatchMode, Opts};
use crate::protocol::types::TransactionStatus;
use crate::state::{BatchReadStateMachine, write_batch};
use crate::trace::{BatchTracer, LogBatchTracer};

use super::batch_results::BatchResults;
use super::stream::Stream;
use super::wire::{Wire, WireMultiResultReader, WirePipeline};

/// Synchronous PostgreSQL connection.
///
/// Wraps an established, authenticated byte stream. Startup, authentication
/// and TLS happen before the stream is handed over.
pub struct Conn<S: Read + Write> {
    stream: Stream<S>,
    buffer_set: BufferSet,
    opts: Opts,
    transaction_status: TransactionStatus,
    is_broken: bool,
    batch_tracer: Option<Arc<dyn BatchTracer>>,
}

impl<S: Read + Write> Conn<S> {
    /// Use an existing, ready-for-query stream.
    pub fn new_with_stream(stream: S, opts: Opts) -> Self {
        let batch_tracer: Option<Arc<dyn BatchTracer>> = if opts.log_batches {
            Some(Arc::new(LogBatchTracer))
        } else {
            None
        };
        Self {
            stream: Stream::new(stream),
            buffer_set: BufferSet::new(),
            opts,
            transaction_status: TransactionStatus::Idle,
            is_broken: false,
            batch_tracer,
        }
    }

    /// Options the connection was created with.
    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Get the current transaction status.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// Check if currently in a transaction.
    pub fn in_transaction(&self) -> bool {
        self.transaction_status.in_transaction()
    }

    /// Check if the connection is broken.
    pub fn is_broken(&self) -> bool {
        self.is_broken
    }

    /// Attach or remove the tracer notified about every batch.
    pub fn set_batch_tracer(&mut self, tracer: Option<Arc<dyn BatchTracer>>) {
        self.batch_tracer = tracer;
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Send every statement of `batch` and return a handle to read the results.
    ///
    /// The whole batch is written before any response is read. Results come
    /// back in queue order through the returned [`BatchResults`], which
    /// borrows the connection until it is dropped.
    pub fn send_batch(&mut self, batch: Batch) -> Result<BatchResults<'_>> {
        if self.is_broken {
            return Err(Error::ConnectionBroken);
        }

        let mode = self.opts.batch_mode;
        self.buffer_set.write_buffer.clear();
        write_batch(
            &mut self.buffer_set.write_buffer,
            &batch,
            mode,
            self.opts.result_format,
        )?;

        tracing::debug!(statements = batch.len(), mode = ?mode, "sending batch");
        if let Err(err) = self.write_pending() {
            self.is_broken = true;
            return Err(err);
        }

        let machine = BatchReadStateMachine::new(mode, batch.len())
            .with_transaction_status(self.transaction_status);
        let tracer = self.batch_tracer.clone();
        let wire = Wire::new(
            &mut self.stream,
            &mut self.buffer_set,
            &mut self.transaction_status,
            &mut self.is_broken,
            machine,
        );

        Ok(match mode {
            BatchMode::Simple => {
                BatchResults::simple(batch, tracer, WireMultiResultReader::new(wire))
            }
            BatchMode::Pipeline => BatchResults::pipelined(batch, tracer, WirePipeline::new(wire)),
        })
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.buffer_set.write_buffer.is_empty() {
            return Ok(());
        }
        self.stream.write_all(&self.buffer_set.write_buffer)?;
        self.stream.flush()?;
        Ok(())
    }
}
