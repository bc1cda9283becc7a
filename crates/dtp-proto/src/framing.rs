//! Varint-delimited message framing.

use std::io::{self, Read, Write};

use prost::Message;

use crate::error::ProtoError;
use crate::varint::{decode_varint, MAX_VARINT_LEN32};
use crate::{DATA_TRANSFER_VERSION, MAX_MESSAGE_LEN};

/// A decoded message plus any bytes that were read past its end.
///
/// The length prefix is read through a fixed scratch buffer, so a short
/// message can leave the start of the following data in hand. Callers must
/// feed `surplus` back in front of the stream.
#[derive(Debug)]
pub struct Framed<M> {
    pub message: M,
    pub surplus: Vec<u8>,
}

/// Append `[varint(len)][message]` to `out`.
pub fn put_delimited<M: Message>(out: &mut Vec<u8>, message: &M) {
    out.extend_from_slice(&message.encode_length_delimited_to_vec());
}

/// Write a single delimited message and flush.
pub fn write_delimited<W: Write, M: Message>(w: &mut W, message: &M) -> Result<(), ProtoError> {
    let mut frame = Vec::new();
    put_delimited(&mut frame, message);
    w.write_all(&frame)?;
    w.flush()?;
    Ok(())
}

/// Write an op request: `[version: u16 BE][op][varint len][message]`.
///
/// The whole request goes out in one `write_all` so a datanode never sees a
/// partial header followed by a stall.
pub fn write_op<W: Write, M: Message>(w: &mut W, op: u8, message: &M) -> Result<(), ProtoError> {
    let mut frame = Vec::with_capacity(3 + MAX_VARINT_LEN32 + message.encoded_len());
    frame.extend_from_slice(&DATA_TRANSFER_VERSION.to_be_bytes());
    frame.push(op);
    put_delimited(&mut frame, message);
    w.write_all(&frame)?;
    w.flush()?;
    Ok(())
}

/// Read as many bytes as fit in `buf`, stopping early only at end of stream.
fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read one `[varint len][message]` frame.
///
/// Up to [`MAX_VARINT_LEN32`] bytes are read in one go; whatever follows the
/// varint is the start of the message body and is not read again. A stream
/// that ends before the scratch buffer fills is still accepted as long as the
/// frame is complete.
pub fn read_delimited<R: Read, M: Message + Default>(r: &mut R) -> Result<Framed<M>, ProtoError> {
    let mut scratch = [0u8; MAX_VARINT_LEN32];
    let filled = read_up_to(r, &mut scratch)?;

    let (len, prefix_len) =
        decode_varint(&scratch[..filled]).ok_or(ProtoError::UnexpectedEof)?;
    if len > MAX_MESSAGE_LEN {
        return Err(ProtoError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_LEN,
        });
    }

    let len = len as usize;
    let mut body = vec![0u8; len];
    let extra = &scratch[prefix_len..filled];
    let carried = extra.len().min(len);
    body[..carried].copy_from_slice(&extra[..carried]);
    r.read_exact(&mut body[carried..])?;

    let message = M::decode(body.as_slice())?;
    Ok(Framed {
        message,
        surplus: extra[carried..].to_vec(),
    })
}
