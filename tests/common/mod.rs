//! Scripted server responses and a recording tracer shared by the wire tests.

#![expect(dead_code)]

use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use pgbatch::protocol::backend::msg_type;
use pgbatch::protocol::codec::MessageBuilder;
use pgbatch::protocol::types::oid;
use pgbatch::{BatchTracer, TraceBatchEndData, TraceBatchQueryData};

/// Backend bytes a test server sends, built message by message.
#[derive(Default)]
pub struct ServerScript {
    bytes: Vec<u8>,
}

impl ServerScript {
    pub fn new() -> Self {
        Self::default()
    }

    fn msg(mut self, type_byte: u8, build: impl FnOnce(&mut MessageBuilder<'_>)) -> Self {
        let mut builder = MessageBuilder::new(&mut self.bytes, type_byte);
        build(&mut builder);
        builder.finish();
        self
    }

    pub fn parse_complete(self) -> Self {
        self.msg(msg_type::PARSE_COMPLETE, |_| {})
    }

    pub fn bind_complete(self) -> Self {
        self.msg(msg_type::BIND_COMPLETE, |_| {})
    }

    pub fn no_data(self) -> Self {
        self.msg(msg_type::NO_DATA, |_| {})
    }

    /// RowDescription of binary INT4 columns.
    pub fn describe_ints(self, names: &[&str]) -> Self {
        self.msg(msg_type::ROW_DESCRIPTION, |m| {
            m.write_i16(names.len() as i16);
            for name in names {
                m.write_cstr(name);
                m.write_u32(0);
                m.write_i16(0);
                m.write_u32(oid::INT4);
                m.write_i16(4);
                m.write_i32(-1);
                m.write_u16(1);
            }
        })
    }

    /// DataRow of binary INT4 values.
    pub fn row_ints(self, values: &[i32]) -> Self {
        self.msg(msg_type::DATA_ROW, |m| {
            m.write_i16(values.len() as i16);
            for value in values {
                m.write_i32(4);
                m.write_i32(*value);
            }
        })
    }

    pub fn complete(self, tag: &str) -> Self {
        self.msg(msg_type::COMMAND_COMPLETE, |m| m.write_cstr(tag))
    }

    pub fn error(self, code: &str, message: &str) -> Self {
        self.msg(msg_type::ERROR_RESPONSE, |m| {
            m.write_u8(b'S');
            m.write_cstr("ERROR");
            m.write_u8(b'V');
            m.write_cstr("ERROR");
            m.write_u8(b'C');
            m.write_cstr(code);
            m.write_u8(b'M');
            m.write_cstr(message);
            m.write_u8(0);
        })
    }

    pub fn notice(self, message: &str) -> Self {
        self.msg(msg_type::NOTICE_RESPONSE, |m| {
            m.write_u8(b'S');
            m.write_cstr("NOTICE");
            m.write_u8(b'M');
            m.write_cstr(message);
            m.write_u8(0);
        })
    }

    pub fn copy_in(self) -> Self {
        self.msg(msg_type::COPY_IN_RESPONSE, |m| {
            m.write_u8(0);
            m.write_i16(0);
        })
    }

    pub fn ready(self, status: u8) -> Self {
        self.msg(msg_type::READY_FOR_QUERY, |m| m.write_u8(status))
    }

    pub fn ready_idle(self) -> Self {
        self.ready(b'I')
    }

    /// A statement that returns no rows.
    pub fn command(self, tag: &str) -> Self {
        self.parse_complete().bind_complete().no_data().complete(tag)
    }

    /// A statement returning one INT4 column named `x`.
    pub fn select_ints(self, values: &[i32]) -> Self {
        let mut script = self.parse_complete().bind_complete().describe_ints(&["x"]);
        for value in values {
            script = script.row_ints(&[*value]);
        }
        script.complete(&format!("SELECT {}", values.len()))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// In-memory connection stream: reads the scripted server bytes and keeps
/// everything the client writes.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    pub written: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(script: ServerScript) -> Self {
        Self {
            input: Cursor::new(script.into_bytes()),
            written: Vec::new(),
        }
    }

    /// Whether every scripted byte has been handed to the reader.
    pub fn is_drained(&self) -> bool {
        self.input.position() as usize == self.input.get_ref().len()
    }

    /// Type bytes of the frontend messages written so far.
    pub fn written_types(&self) -> Vec<u8> {
        message_types(&self.written)
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Split a frontend byte stream into message type bytes.
pub fn message_types(mut bytes: &[u8]) -> Vec<u8> {
    let mut types = Vec::new();
    while bytes.len() >= 5 {
        let len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        types.push(bytes[0]);
        bytes = &bytes[1 + len..];
    }
    types
}

/// One recorded trace event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Query {
        sql: String,
        tag: Option<String>,
        err: Option<String>,
    },
    End {
        err: Option<String>,
    },
}

/// Tracer that records every event.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Query { .. }))
            .count()
    }

    pub fn end_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::End { .. }))
            .count()
    }
}

impl BatchTracer for Recorder {
    fn trace_batch_query(&self, data: TraceBatchQueryData<'_>) {
        self.events.lock().unwrap().push(Event::Query {
            sql: data.sql.to_owned(),
            tag: data.command_tag.map(|tag| tag.as_str().to_owned()),
            err: data.err.map(ToString::to_string),
        });
    }

    fn trace_batch_end(&self, data: TraceBatchEndData<'_>) {
        self.events.lock().unwrap().push(Event::End {
            err: data.err.map(ToString::to_string),
        });
    }
}
