//! Encoding a batch into extended-protocol messages.

use crate::batch::Batch;
use crate::error::Result;
use crate::opts::BatchMode;
use crate::protocol::frontend::{
    write_bind, write_describe_portal, write_execute, write_parse, write_sync,
};
use crate::protocol::types::{FormatCode, Oid};

/// Write every statement of `batch` to `buf`.
///
/// Each statement becomes Parse (unless it uses a prepared statement), Bind,
/// Describe and Execute on the unnamed portal. In [`BatchMode::Pipeline`] every
/// statement is followed by its own Sync; in [`BatchMode::Simple`] one Sync
/// ends the whole batch. An empty batch writes nothing.
///
/// On error `buf` is left truncated to its original length.
pub fn write_batch(
    buf: &mut Vec<u8>,
    batch: &Batch,
    mode: BatchMode,
    result_format: FormatCode,
) -> Result<()> {
    let start = buf.len();
    if let Err(err) = write_items(buf, batch, mode, result_format) {
        buf.truncate(start);
        return Err(err);
    }
    Ok(())
}

fn write_items(
    buf: &mut Vec<u8>,
    batch: &Batch,
    mode: BatchMode,
    result_format: FormatCode,
) -> Result<()> {
    let mut param_oids: Vec<Oid> = Vec::new();
    for item in batch.items() {
        let statement = match &item.statement {
            Some(prepared) => prepared.name.as_str(),
            None => {
                param_oids.clear();
                param_oids.extend(item.arguments.iter().map(|arg| arg.natural_oid()));
                write_parse(buf, "", &item.query, &param_oids)?;
                ""
            }
        };
        write_bind(buf, "", statement, &item.arguments, result_format)?;
        write_describe_portal(buf, "");
        write_execute(buf, "", 0);
        if mode == BatchMode::Pipeline {
            write_sync(buf);
        }
    }
    if mode == BatchMode::Simple && !batch.is_empty() {
        write_sync(buf);
    }
    Ok(())
}
