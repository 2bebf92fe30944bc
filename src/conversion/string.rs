//! String type implementations.

use crate::error::{Error, Result};
use crate::protocol::types::{Oid, oid};

use super::FromWireValue;

fn is_textual(oid: Oid) -> bool {
    matches!(
        oid,
        oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME | oid::UNKNOWN | oid::JSON
    )
}

impl FromWireValue for String {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !is_textual(oid) && oid != oid::JSONB {
            return Err(Error::Decode(format!(
                "cannot decode oid {} as String",
                oid
            )));
        }
        simdutf8::compat::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        // Binary jsonb carries a one-byte version prefix
        let bytes = match oid {
            oid::JSONB => match bytes.split_first() {
                Some((1, rest)) => rest,
                _ => return Err(Error::Decode("unsupported jsonb version".into())),
            },
            _ if is_textual(oid) => bytes,
            _ => {
                return Err(Error::Decode(format!(
                    "cannot decode oid {} as String",
                    oid
                )));
            }
        };
        simdutf8::compat::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
    }
}
