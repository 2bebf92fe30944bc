//! Sequencing messages of the extended query protocol.

use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::Result;
use crate::protocol::codec::{read_u8, read_u16};
use crate::protocol::types::{FormatCode, TransactionStatus};

/// ReadyForQuery message - the server has processed everything up to a Sync.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct ReadyForQuery {
    /// Transaction status byte
    pub status: u8,
}

impl ReadyForQuery {
    /// Parse a ReadyForQuery message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<&Self> {
        Ok(Self::ref_from_bytes(payload)?)
    }

    /// Get the transaction status.
    pub fn transaction_status(&self) -> Option<TransactionStatus> {
        TransactionStatus::from_byte(self.status)
    }
}

/// CopyInResponse / CopyOutResponse - the statement switched into COPY mode.
///
/// Both messages share a layout; batches only inspect them to report the
/// unsupported result kind.
#[derive(Debug, Clone)]
pub struct CopyResponse {
    /// Overall format (0=text, 1=binary)
    pub format: FormatCode,
    /// Number of columns being copied
    pub num_columns: u16,
}

impl CopyResponse {
    /// Parse a CopyInResponse or CopyOutResponse payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (format_byte, rest) = read_u8(payload)?;
        let (num_columns, _) = read_u16(rest)?;
        Ok(Self {
            format: FormatCode::from_u16(format_byte as u16),
            num_columns,
        })
    }
}
