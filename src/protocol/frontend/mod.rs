//! PostgreSQL frontend (client → server) messages.

pub mod extended;

pub use extended::{write_bind, write_describe_portal, write_execute, write_parse, write_sync};

/// Frontend message type bytes.
pub mod msg_type {
    /// Parse (extended query protocol)
    pub const PARSE: u8 = b'P';
    /// Bind (extended query protocol)
    pub const BIND: u8 = b'B';
    /// Execute (extended query protocol)
    pub const EXECUTE: u8 = b'E';
    /// Describe (extended query protocol)
    pub const DESCRIBE: u8 = b'D';
    /// Sync (extended query protocol)
    pub const SYNC: u8 = b'S';
}
