//! Server-side prepared statement descriptors.

use crate::protocol::types::Oid;

/// A statement already prepared on the connection.
///
/// Batch items queued with a prepared statement skip `Parse` and bind the
/// named statement directly. Preparing and caching statements happens outside
/// of batch execution; the descriptor only has to name a statement that exists
/// on the connection the batch is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    /// Statement name
    pub name: String,
    /// SQL text the statement was prepared from, reported to batch tracers
    pub query: String,
    /// Parameter type OIDs the statement was prepared with
    pub param_oids: Vec<Oid>,
}

impl PreparedStatement {
    /// Describe a prepared statement.
    pub fn new(name: impl Into<String>, query: impl Into<String>, param_oids: Vec<Oid>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            param_oids,
        }
    }
}
