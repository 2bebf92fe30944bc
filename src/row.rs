//! Owned result rows.
//!
//! Rows outlive the read buffer they were parsed from, so a caller can hold on
//! to them while the batch moves on to the next result.

use std::sync::Arc;

use crate::conversion::{FromRow, FromWireValue};
use crate::error::{Error, Result};
use crate::protocol::backend::{DataRow, RowDescription};
use crate::protocol::types::{FormatCode, Oid};

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Table OID (0 if not a table column)
    pub table_oid: Oid,
    /// Data type OID
    pub type_oid: Oid,
    /// Wire format of the column values
    pub format: FormatCode,
}

impl Column {
    /// Create column metadata.
    pub fn new(name: impl Into<String>, type_oid: Oid, format: FormatCode) -> Self {
        Self {
            name: name.into(),
            table_oid: 0,
            type_oid,
            format,
        }
    }
}

/// Build owned column metadata from a RowDescription.
pub(crate) fn columns_from_description(desc: &RowDescription<'_>) -> Arc<[Column]> {
    desc.fields()
        .iter()
        .map(|field| Column {
            name: field.name.to_owned(),
            table_oid: field.table_oid(),
            type_oid: field.type_oid(),
            format: field.format(),
        })
        .collect()
}

/// A single result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Option<Vec<u8>>>,
}

impl Row {
    /// Create a row from column metadata and raw values.
    ///
    /// Fails if the number of values does not match the columns.
    pub fn new(columns: Arc<[Column]>, values: Vec<Option<Vec<u8>>>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(Error::Protocol(format!(
                "DataRow has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub(crate) fn from_data_row(columns: Arc<[Column]>, data: DataRow<'_>) -> Result<Self> {
        let values = data
            .values()?
            .into_iter()
            .map(|value| value.map(<[u8]>::to_vec))
            .collect();
        Self::new(columns, values)
    }

    /// Column metadata.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw bytes of a column; `None` is SQL NULL.
    pub fn raw(&self, idx: usize) -> Option<&[u8]> {
        self.values.get(idx).and_then(|value| value.as_deref())
    }

    /// Decode a column by position.
    pub fn get<T: FromWireValue>(&self, idx: usize) -> Result<T> {
        let column = self.columns.get(idx).ok_or_else(|| {
            Error::Decode(format!(
                "column index {} out of range ({} columns)",
                idx,
                self.columns.len()
            ))
        })?;
        match self.values.get(idx).and_then(Option::as_deref) {
            None => T::from_null(),
            Some(bytes) => match column.format {
                FormatCode::Text => T::from_text(column.type_oid, bytes),
                FormatCode::Binary => T::from_binary(column.type_oid, bytes),
            },
        }
    }

    /// Decode a column by name.
    pub fn get_by_name<T: FromWireValue>(&self, name: &str) -> Result<T> {
        let idx = self
            .columns
            .iter()
            .position(|column| column.name == name)
            .ok_or_else(|| Error::Decode(format!("no column named {:?}", name)))?;
        self.get(idx)
    }

    /// Decode the whole row.
    pub fn decode<T: FromRow>(&self) -> Result<T> {
        T::from_row(self)
    }
}
