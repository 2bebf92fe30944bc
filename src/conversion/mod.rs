//! Conversions between Rust values and PostgreSQL wire values.
//!
//! Arguments are captured as owned [`Value`]s when a statement is queued, so a
//! batch can be built up front and encoded later. Result columns are decoded
//! through [`FromWireValue`] and whole rows through [`FromRow`].

mod bytes;
mod params;
mod primitives;
mod row;
mod string;

use crate::error::{Error, Result};
use crate::protocol::types::{Oid, oid};

pub use params::ToParams;
pub use row::FromRow;

/// Trait for decoding PostgreSQL values into Rust types.
///
/// The OID parameter allows implementations to check the PostgreSQL type
/// and reject incompatible types with clear error messages.
pub trait FromWireValue: Sized {
    /// Decode from NULL value.
    ///
    /// Default implementation returns an error. Override for types that can
    /// represent NULL (like `Option<T>`).
    fn from_null() -> Result<Self> {
        Err(Error::Decode("unexpected NULL value".into()))
    }

    /// Decode from text format bytes.
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self>;

    /// Decode from binary format bytes.
    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self>;
}

impl<T: FromWireValue> FromWireValue for Option<T> {
    fn from_null() -> Result<Self> {
        Ok(None)
    }

    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        T::from_text(oid, bytes).map(Some)
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        T::from_binary(oid, bytes).map(Some)
    }
}

/// An owned statement argument.
///
/// Every variant is sent in binary format with its natural type OID; the
/// server applies its usual assignment casts from there.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL (type left for the server to infer)
    Null,
    /// boolean
    Bool(bool),
    /// smallint
    Int2(i16),
    /// integer
    Int4(i32),
    /// bigint
    Int8(i64),
    /// real
    Float4(f32),
    /// double precision
    Float8(f64),
    /// text
    Text(String),
    /// bytea
    Bytea(Vec<u8>),
}

impl Value {
    /// The OID this value naturally encodes to.
    pub fn natural_oid(&self) -> Oid {
        match self {
            Value::Null => oid::UNSPECIFIED,
            Value::Bool(_) => oid::BOOL,
            Value::Int2(_) => oid::INT2,
            Value::Int4(_) => oid::INT4,
            Value::Int8(_) => oid::INT8,
            Value::Float4(_) => oid::FLOAT4,
            Value::Float8(_) => oid::FLOAT8,
            Value::Text(_) => oid::TEXT,
            Value::Bytea(_) => oid::BYTEA,
        }
    }

    /// Write the value as a length-prefixed binary parameter.
    ///
    /// NULL is written as length -1 with no data.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Value::Null => buf.extend_from_slice(&(-1_i32).to_be_bytes()),
            Value::Bool(v) => {
                buf.extend_from_slice(&1_i32.to_be_bytes());
                buf.push(u8::from(*v));
            }
            Value::Int2(v) => {
                buf.extend_from_slice(&2_i32.to_be_bytes());
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Int4(v) => {
                buf.extend_from_slice(&4_i32.to_be_bytes());
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Int8(v) => {
                buf.extend_from_slice(&8_i32.to_be_bytes());
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Float4(v) => {
                buf.extend_from_slice(&4_i32.to_be_bytes());
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Float8(v) => {
                buf.extend_from_slice(&8_i32.to_be_bytes());
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Text(v) => write_length_prefixed(buf, v.as_bytes())?,
            Value::Bytea(v) => write_length_prefixed(buf, v)?,
        }
        Ok(())
    }
}

fn write_length_prefixed(buf: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = i32::try_from(data.len())
        .map_err(|_| Error::Decode(format!("parameter too large: {} bytes", data.len())))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(data);
    Ok(())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int2(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int4(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int8(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float4(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float8(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytea(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytea(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
