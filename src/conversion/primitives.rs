//! Primitive type implementations (bool, integers, floats).

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::protocol::types::{Oid, oid};

use super::FromWireValue;

fn mismatch<T>(oid: Oid, target: &str) -> Result<T> {
    Err(Error::Decode(format!("cannot decode oid {} as {}", oid, target)))
}

/// Parse a text-format scalar.
fn parse_text<T>(bytes: &[u8], target: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))?;
    s.parse()
        .map_err(|e| Error::Decode(format!("invalid {}: {}", target, e)))
}

fn fixed<const N: usize>(bytes: &[u8], target: &str) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| Error::Decode(format!("invalid {} length: {}", target, bytes.len())))
}

// === Boolean ===

impl FromWireValue for bool {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BOOL {
            return mismatch(oid, "bool");
        }
        match bytes {
            b"t" | b"true" | b"TRUE" | b"T" | b"1" => Ok(true),
            b"f" | b"false" | b"FALSE" | b"F" | b"0" => Ok(false),
            _ => Err(Error::Decode(format!(
                "invalid boolean: {:?}",
                String::from_utf8_lossy(bytes)
            ))),
        }
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BOOL {
            return mismatch(oid, "bool");
        }
        let [b] = fixed::<1>(bytes, "boolean")?;
        Ok(b != 0)
    }
}

// === Integer types ===

impl FromWireValue for i16 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::INT2 {
            return mismatch(oid, "i16");
        }
        parse_text(bytes, "i16")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::INT2 {
            return mismatch(oid, "i16");
        }
        Ok(i16::from_be_bytes(fixed(bytes, "i16")?))
    }
}

impl FromWireValue for i32 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::INT2 | oid::INT4 | oid::OID) {
            return mismatch(oid, "i32");
        }
        parse_text(bytes, "i32")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::INT2 => Ok(i32::from(i16::from_be_bytes(fixed(bytes, "i16")?))),
            oid::INT4 => Ok(i32::from_be_bytes(fixed(bytes, "i32")?)),
            _ => mismatch(oid, "i32"),
        }
    }
}

impl FromWireValue for i64 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::INT2 | oid::INT4 | oid::INT8 | oid::OID) {
            return mismatch(oid, "i64");
        }
        parse_text(bytes, "i64")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::INT2 => Ok(i64::from(i16::from_be_bytes(fixed(bytes, "i16")?))),
            oid::INT4 => Ok(i64::from(i32::from_be_bytes(fixed(bytes, "i32")?))),
            oid::INT8 => Ok(i64::from_be_bytes(fixed(bytes, "i64")?)),
            oid::OID => Ok(i64::from(u32::from_be_bytes(fixed(bytes, "oid")?))),
            _ => mismatch(oid, "i64"),
        }
    }
}

// === Floating point ===

impl FromWireValue for f32 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::FLOAT4 {
            return mismatch(oid, "f32");
        }
        parse_text(bytes, "f32")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::FLOAT4 {
            return mismatch(oid, "f32");
        }
        Ok(f32::from_be_bytes(fixed(bytes, "f32")?))
    }
}

impl FromWireValue for f64 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::FLOAT4 | oid::FLOAT8) {
            return mismatch(oid, "f64");
        }
        parse_text(bytes, "f64")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::FLOAT4 => Ok(f64::from(f32::from_be_bytes(fixed(bytes, "f32")?))),
            oid::FLOAT8 => Ok(f64::from_be_bytes(fixed(bytes, "f64")?)),
            _ => mismatch(oid, "f64"),
        }
    }
}
