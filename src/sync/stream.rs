use std::io::{BufReader, Read, Write};

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};

/// Buffered connection stream.
///
/// Any established, authenticated `Read + Write` byte stream works: a
/// `TcpStream`, a `UnixStream`, a TLS stream, or an in-memory stream in tests.
pub struct Stream<S> {
    inner: BufReader<S>,
}

impl<S: Read + Write> Stream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.inner.read_exact(buf)
    }

    pub fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.inner.get_mut().write_all(buf)
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.get_mut().flush()
    }

    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }
}

/// Read one backend message into `buffer_set`.
pub(crate) fn read_message_into<S: Read + Write>(
    stream: &mut Stream<S>,
    buffer_set: &mut BufferSet,
) -> Result<()> {
    let mut type_byte = [0u8; 1];
    stream.read_exact(&mut type_byte)?;
    buffer_set.type_byte = type_byte[0];

    let mut length_bytes = [0u8; 4];
    stream.read_exact(&mut length_bytes)?;
    let length = u32::from_be_bytes(length_bytes);

    if length < 4 {
        return Err(Error::Protocol(format!(
            "Invalid message length: {}",
            length
        )));
    }

    let payload_len = (length - 4) as usize;
    buffer_set.read_buffer.clear();
    buffer_set.read_buffer.resize(payload_len, 0);
    stream.read_exact(&mut buffer_set.read_buffer)?;

    Ok(())
}
