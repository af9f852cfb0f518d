use binprot_derive::{BinProtRead, BinProtWrite};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Error;

// Wire layout of a framed message:
//   name length    u16, big endian
//   name bytes     utf-8
//   kind tag       u8 (1 call, 2 reply, 3 exception)
//   sequence       i64, big endian
//   payload        binprot-encoded struct fields
//   stop marker    0x00

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Call,
    Reply,
    Exception,
}

impl MessageKind {
    pub fn as_byte(self) -> u8 {
        match self {
            MessageKind::Call => 1,
            MessageKind::Reply => 2,
            MessageKind::Exception => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            1 => Ok(MessageKind::Call),
            2 => Ok(MessageKind::Reply),
            3 => Ok(MessageKind::Exception),
            other => Err(Error::UnknownMessageKind(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageHeader {
    pub method: String,
    pub kind: MessageKind,
    pub seq: i64,
}

/// Envelope framing for one wire format: how a message begins and ends around
/// its binprot-encoded payload.
pub trait Protocol {
    fn write_message_begin<W: std::io::Write>(
        &self,
        w: &mut W,
        header: &MessageHeader,
    ) -> Result<(), Error>;

    fn write_message_end<W: std::io::Write>(&self, w: &mut W) -> Result<(), Error>;

    fn read_message_begin<R: std::io::Read>(&self, r: &mut R) -> Result<MessageHeader, Error>;

    fn read_message_end<R: std::io::Read>(&self, r: &mut R) -> Result<(), Error>;
}

const STOP_MARKER: u8 = 0;

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryProtocol;

impl Protocol for BinaryProtocol {
    fn write_message_begin<W: std::io::Write>(
        &self,
        w: &mut W,
        header: &MessageHeader,
    ) -> Result<(), Error> {
        let name = header.method.as_bytes();
        if name.len() > u16::MAX as usize {
            return Err(Error::MethodNameTooLong(name.len()));
        }
        w.write_u16::<BigEndian>(name.len() as u16).map_err(Error::Encoding)?;
        w.write_all(name).map_err(Error::Encoding)?;
        w.write_u8(header.kind.as_byte()).map_err(Error::Encoding)?;
        w.write_i64::<BigEndian>(header.seq).map_err(Error::Encoding)?;
        Ok(())
    }

    fn write_message_end<W: std::io::Write>(&self, w: &mut W) -> Result<(), Error> {
        w.write_u8(STOP_MARKER).map_err(Error::Encoding)
    }

    fn read_message_begin<R: std::io::Read>(&self, r: &mut R) -> Result<MessageHeader, Error> {
        let name_len = r.read_u16::<BigEndian>().map_err(decoding)? as usize;
        let mut name = vec![0u8; name_len];
        r.read_exact(&mut name).map_err(decoding)?;
        let method = String::from_utf8(name).map_err(Error::MethodNameNotUtf8)?;
        let kind = MessageKind::from_byte(r.read_u8().map_err(decoding)?)?;
        let seq = r.read_i64::<BigEndian>().map_err(decoding)?;
        Ok(MessageHeader { method, kind, seq })
    }

    fn read_message_end<R: std::io::Read>(&self, r: &mut R) -> Result<(), Error> {
        let byte = r.read_u8().map_err(decoding)?;
        if byte != STOP_MARKER {
            return Err(Error::BadStopMarker(byte));
        }
        Ok(())
    }
}

fn decoding(e: std::io::Error) -> Error {
    Error::Decoding(e.into())
}

/// Structured failure reported by the remote side in place of a normal reply.
#[derive(BinProtRead, BinProtWrite, Debug, Clone, PartialEq)]
pub struct ApplicationException {
    pub message: String,
}

impl std::fmt::Display for ApplicationException {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
