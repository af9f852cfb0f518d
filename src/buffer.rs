use binprot::{BinProtRead, BinProtWrite};

use crate::error::Error;
use crate::protocol::{MessageHeader, Protocol};

/// In-memory byte region exposing both directions of the wire codec. The same
/// bytes back writing (which appends at the end) and reading (which consumes
/// from the front), so one buffer composes an outgoing message or parses an
/// incoming one, never both in the same lifetime.
pub struct MessageBuffer<P> {
    protocol: P,
    bytes: Vec<u8>,
    pos: usize,
}

impl<P: Protocol> MessageBuffer<P> {
    pub fn new(protocol: P, bytes: Vec<u8>) -> Self {
        MessageBuffer { protocol, bytes, pos: 0 }
    }

    pub fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), Error> {
        self.protocol.write_message_begin(&mut self.bytes, header)
    }

    pub fn encode_struct<T: BinProtWrite>(&mut self, value: &T) -> Result<(), Error> {
        value.binprot_write(&mut self.bytes).map_err(Error::Encoding)
    }

    pub fn write_message_end(&mut self) -> Result<(), Error> {
        self.protocol.write_message_end(&mut self.bytes)
    }

    pub fn read_message_begin(&mut self) -> Result<MessageHeader, Error> {
        let mut unread = &self.bytes[self.pos..];
        let header = self.protocol.read_message_begin(&mut unread)?;
        self.pos = self.bytes.len() - unread.len();
        Ok(header)
    }

    pub fn decode_struct<T: BinProtRead>(&mut self) -> Result<T, Error> {
        let mut unread = &self.bytes[self.pos..];
        let value = T::binprot_read(&mut unread).map_err(Error::Decoding)?;
        self.pos = self.bytes.len() - unread.len();
        Ok(value)
    }

    pub fn read_message_end(&mut self) -> Result<(), Error> {
        let mut unread = &self.bytes[self.pos..];
        self.protocol.read_message_end(&mut unread)?;
        self.pos = self.bytes.len() - unread.len();
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
