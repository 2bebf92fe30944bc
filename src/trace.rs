//! Batch tracing hooks.

use crate::command_tag::CommandTag;
use crate::conversion::Value;
use crate::error::Error;

/// Data for one queued statement, reported once its result is known.
#[derive(Debug, Clone, Copy)]
pub struct TraceBatchQueryData<'a> {
    /// SQL text of the statement
    pub sql: &'a str,
    /// Arguments it was queued with
    pub args: &'a [Value],
    /// Completion tag, when the statement completed
    pub command_tag: Option<&'a CommandTag>,
    /// Error the statement ended with
    pub err: Option<&'a Error>,
}

/// Data for the end of a batch.
#[derive(Debug, Clone, Copy)]
pub struct TraceBatchEndData<'a> {
    /// Final error of the batch
    pub err: Option<&'a Error>,
}

/// Observer for batch execution.
///
/// Every queued statement produces exactly one [`trace_batch_query`] call,
/// including statements the caller never retrieved, followed by exactly one
/// [`trace_batch_end`] call per batch.
///
/// [`trace_batch_query`]: BatchTracer::trace_batch_query
/// [`trace_batch_end`]: BatchTracer::trace_batch_end
pub trait BatchTracer: Send + Sync {
    /// Called once per queued statement.
    fn trace_batch_query(&self, data: TraceBatchQueryData<'_>);

    /// Called once when the batch ends.
    fn trace_batch_end(&self, data: TraceBatchEndData<'_>);
}

/// A [`BatchTracer`] that writes events through `tracing`.
///
/// Successful statements are logged at debug level, failures at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBatchTracer;

impl BatchTracer for LogBatchTracer {
    fn trace_batch_query(&self, data: TraceBatchQueryData<'_>) {
        match data.err {
            None => tracing::debug!(
                sql = data.sql,
                args = data.args.len(),
                command_tag = data.command_tag.map(CommandTag::as_str),
                "batch query"
            ),
            Some(err) => tracing::warn!(
                sql = data.sql,
                args = data.args.len(),
                error = %err,
                "batch query failed"
            ),
        }
    }

    fn trace_batch_end(&self, data: TraceBatchEndData<'_>) {
        match data.err {
            None => tracing::debug!("batch end"),
            Some(err) => tracing::warn!(error = %err, "batch end with error"),
        }
    }
}
