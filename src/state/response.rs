//! Classification of backend messages received while reading a batch.

use std::sync::Arc;

use crate::command_tag::CommandTag;
use crate::error::{Error, ErrorFields, Result};
use crate::protocol::backend::{
    CommandComplete, CopyResponse, DataRow, ErrorResponse, NoticeResponse, RawMessage, ReadyForQuery,
    RowDescription, msg_type,
};
use crate::protocol::types::TransactionStatus;
use crate::row::{Column, Row, columns_from_description};

/// What a backend message means for the statement being read.
#[derive(Debug)]
pub enum Response {
    /// Nothing the reader has to act on (ParseComplete, BindComplete, notices).
    Skip,
    /// The portal was described; `None` means it returns no rows.
    Described(Option<Arc<[Column]>>),
    /// One result row.
    Row(Row),
    /// The statement completed.
    Complete(CommandTag),
    /// The statement started a COPY FROM STDIN.
    CopyIn,
    /// The statement started a COPY TO STDOUT.
    CopyOut,
    /// The server reported an error.
    Error(ErrorFields),
    /// The server reached a Sync point.
    Ready(TransactionStatus),
}

/// Decodes backend messages, remembering the columns of the current result.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    columns: Option<Arc<[Column]>>,
}

impl ResponseDecoder {
    /// Create a decoder with no current result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one message.
    ///
    /// An `Err` means the message stream itself is malformed.
    pub fn decode(&mut self, msg: RawMessage<'_>) -> Result<Response> {
        if msg.is_async() {
            if msg.type_byte == msg_type::NOTICE_RESPONSE {
                let notice = NoticeResponse::parse(msg.payload)?;
                tracing::debug!("notice: {}", notice.fields);
            }
            return Ok(Response::Skip);
        }
        match msg.type_byte {
            msg_type::PARSE_COMPLETE | msg_type::BIND_COMPLETE => Ok(Response::Skip),
            msg_type::ROW_DESCRIPTION => {
                let desc = RowDescription::parse(msg.payload)?;
                let columns = columns_from_description(&desc);
                self.columns = Some(columns.clone());
                Ok(Response::Described(Some(columns)))
            }
            msg_type::NO_DATA => {
                self.columns = None;
                Ok(Response::Described(None))
            }
            msg_type::DATA_ROW => {
                let Some(columns) = &self.columns else {
                    return Err(Error::Protocol("DataRow without RowDescription".into()));
                };
                let data = DataRow::parse(msg.payload)?;
                Ok(Response::Row(Row::from_data_row(columns.clone(), data)?))
            }
            msg_type::COMMAND_COMPLETE => {
                let complete = CommandComplete::parse(msg.payload)?;
                Ok(Response::Complete(CommandTag::new(complete.tag)))
            }
            msg_type::EMPTY_QUERY_RESPONSE => Ok(Response::Complete(CommandTag::default())),
            msg_type::COPY_IN_RESPONSE | msg_type::COPY_OUT_RESPONSE => {
                let copy = CopyResponse::parse(msg.payload)?;
                tracing::debug!(
                    columns = copy.num_columns,
                    "COPY response in batch ('{}')",
                    msg.type_byte as char
                );
                if msg.type_byte == msg_type::COPY_IN_RESPONSE {
                    Ok(Response::CopyIn)
                } else {
                    Ok(Response::CopyOut)
                }
            }
            msg_type::ERROR_RESPONSE => {
                let error = ErrorResponse::parse(msg.payload)?;
                Ok(Response::Error(error.fields))
            }
            msg_type::READY_FOR_QUERY => {
                let ready = ReadyForQuery::parse(msg.payload)?;
                let status = ready.transaction_status().ok_or_else(|| {
                    Error::Protocol("ReadyForQuery: unknown transaction status".into())
                })?;
                Ok(Response::Ready(status))
            }
            other => Err(Error::Protocol(format!(
                "unexpected message '{}' while reading batch results",
                other as char
            ))),
        }
    }
}
