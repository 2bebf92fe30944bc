//! Batch construction.

use crate::conversion::{ToParams, Value};
use crate::statement::PreparedStatement;

/// One queued statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    /// SQL text with `$1, $2, ...` placeholders
    pub query: String,
    /// Positional arguments
    pub arguments: Vec<Value>,
    /// Prepared statement to bind instead of parsing `query`
    pub statement: Option<PreparedStatement>,
}

/// An ordered queue of statements sent to the server together.
///
/// Statements are not validated when queued; a bad query or a wrong argument
/// count surfaces as the error of that statement's result.
///
/// ```
/// use pgbatch::Batch;
///
/// let mut batch = Batch::new();
/// batch.queue("INSERT INTO t VALUES ($1)", (1_i32,));
/// batch.queue("SELECT x FROM t", ());
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    items: Vec<BatchItem>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement.
    pub fn queue(&mut self, query: impl Into<String>, params: impl ToParams) {
        self.items.push(BatchItem {
            query: query.into(),
            arguments: params.into_values(),
            statement: None,
        });
    }

    /// Append an execution of an already prepared statement.
    pub fn queue_prepared(&mut self, statement: &PreparedStatement, params: impl ToParams) {
        self.items.push(BatchItem {
            query: statement.query.clone(),
            arguments: params.into_values(),
            statement: Some(statement.clone()),
        });
    }

    /// Number of queued statements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queued statements in submission order.
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }
}
