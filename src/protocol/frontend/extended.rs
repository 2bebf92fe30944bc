//! Extended query protocol messages.

use crate::conversion::Value;
use crate::error::{Error, Result};
use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::{FormatCode, Oid};

/// Write a Parse message to create a prepared statement.
///
/// - `name`: Statement name (empty string for unnamed statement)
/// - `query`: SQL query with $1, $2, ... placeholders
/// - `param_oids`: Parameter type OIDs (0 = let server infer)
pub fn write_parse(buf: &mut Vec<u8>, name: &str, query: &str, param_oids: &[Oid]) -> Result<()> {
    let count = param_count(param_oids.len())?;
    let mut msg = MessageBuilder::new(buf, super::msg_type::PARSE);
    msg.write_cstr(name);
    msg.write_cstr(query);
    msg.write_u16(count);
    for &oid in param_oids {
        msg.write_u32(oid);
    }
    msg.finish();
    Ok(())
}

/// Write a Bind message to create a portal from a prepared statement.
///
/// Parameters are always sent in binary format. `result_format` applies to
/// every result column.
pub fn write_bind(
    buf: &mut Vec<u8>,
    portal: &str,
    statement: &str,
    params: &[Value],
    result_format: FormatCode,
) -> Result<()> {
    let count = param_count(params.len())?;
    let mut msg = MessageBuilder::new(buf, super::msg_type::BIND);

    msg.write_cstr(portal);
    msg.write_cstr(statement);

    // One format code applies to all parameters
    msg.write_i16(1);
    msg.write_i16(FormatCode::Binary as i16);

    msg.write_u16(count);
    for param in params {
        param.encode(msg.buf())?;
    }

    msg.write_i16(1);
    msg.write_i16(result_format as i16);

    msg.finish();
    Ok(())
}

/// Write a Describe message for a portal.
pub fn write_describe_portal(buf: &mut Vec<u8>, name: &str) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::DESCRIBE);
    msg.write_u8(b'P');
    msg.write_cstr(name);
    msg.finish();
}

/// Write an Execute message to run a portal.
///
/// - `portal`: Portal name
/// - `max_rows`: Maximum number of rows to return (0 = unlimited)
pub fn write_execute(buf: &mut Vec<u8>, portal: &str, max_rows: u32) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::EXECUTE);
    msg.write_cstr(portal);
    msg.write_u32(max_rows);
    msg.finish();
}

/// Write a Sync message.
///
/// This ends an extended query sequence and causes:
/// - Implicit COMMIT if successful and not in explicit transaction
/// - Implicit ROLLBACK if failed and not in explicit transaction
/// - Server responds with ReadyForQuery
pub fn write_sync(buf: &mut Vec<u8>) {
    let msg = MessageBuilder::new(buf, super::msg_type::SYNC);
    msg.finish();
}

/// The protocol counts parameters in 16 bits.
fn param_count(len: usize) -> Result<u16> {
    match u16::try_from(len) {
        Ok(count) => Ok(count),
        Err(_) => Err(Error::InvalidUsage(format!(
            "too many parameters: {} (at most {})",
            len,
            u16::MAX
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_message_layout() {
        let mut buf = Vec::new();
        write_parse(&mut buf, "", "SELECT $1", &[23]).unwrap();

        assert_eq!(buf[0], b'P');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        assert_eq!(len + 1, buf.len());
        assert_eq!(&buf[5..7], b"\0S");
        assert_eq!(&buf[buf.len() - 6..], &[0, 1, 0, 0, 0, 23]);
    }

    #[test]
    fn bind_message_layout() {
        let mut buf = Vec::new();
        write_bind(
            &mut buf,
            "",
            "s1",
            &[Value::Int4(7), Value::Null],
            FormatCode::Binary,
        )
        .unwrap();

        let expected: Vec<u8> = [
            &b"\0s1\0"[..],
            &[0u8, 1, 0, 1][..],
            &[0u8, 2][..],
            &[0u8, 0, 0, 4, 0, 0, 0, 7][..],
            &[0xffu8, 0xff, 0xff, 0xff][..],
            &[0u8, 1, 0, 1][..],
        ]
        .concat();
        assert_eq!(buf[0], b'B');
        assert_eq!(&buf[5..], expected.as_slice());
    }

    #[test]
    fn too_many_parameters_are_rejected() {
        let mut buf = Vec::new();
        let oids = vec![0; usize::from(u16::MAX) + 1];
        assert!(matches!(
            write_parse(&mut buf, "", "SELECT 1", &oids),
            Err(Error::InvalidUsage(_))
        ));
        let params = vec![Value::Null; usize::from(u16::MAX) + 1];
        assert!(matches!(
            write_bind(&mut buf, "", "", &params, FormatCode::Binary),
            Err(Error::InvalidUsage(_))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn sync_is_empty_message() {
        let mut buf = Vec::new();
        write_sync(&mut buf);
        assert_eq!(buf, vec![b'S', 0, 0, 0, 4]);
    }
}
