//! Frame structure and encoding/decoding

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::trace;

use crate::{
    checksum,
    constants::{
        HEADER_SIZE, MAX_FRAME_LENGTH, PREFIX_MAGIC, RETURN_CODE_SIZE, SUFFIX_MAGIC,
        TRAILER_SIZE, opcodes,
    },
    error::{Error, Result},
};

/// Whether decoding verifies the received CRC
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum CrcCheck {
    /// Reject frames whose CRC does not match
    #[default]
    Strict,

    /// Accept any CRC (firmware that computes it wrongly)
    Lenient,
}

/// One wire frame
///
/// # Frame Structure
///
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬─────────────┬─────────┬──────────┬──────────┐
/// │  Prefix  │  SeqNo   │ Command  │  Length  │ Return code │ Payload │  CRC-32  │  Suffix  │
/// │ 000055AA │ 4 bytes  │ 4 bytes  │ 4 bytes  │ 4 bytes     │ N bytes │ 4 bytes  │ 0000AA55 │
/// └──────────┴──────────┴──────────┴──────────┴─────────────┴─────────┴──────────┴──────────┘
/// ```
///
/// All words are big-endian. The opcode lives in the low byte of the command
/// word and the length counts everything after the length word. Only device
/// frames carry a return code. The CRC covers every byte before it.
///
/// # Examples
///
/// ```
/// use tuyalink_core::{Frame, packet::CrcCheck};
///
/// let frame = Frame::new(0x09, b"{}".to_vec());
/// let encoded = frame.encode().unwrap();
/// assert_eq!(encoded.len(), 16 + 2 + 8);
///
/// let decoded = Frame::decode(&encoded, CrcCheck::Strict).unwrap();
/// assert_eq!(decoded, frame);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence word (zero in requests this client sends)
    pub seqno: u32,

    /// Wire opcode
    pub opcode: u8,

    /// Device status word, present in device frames only
    pub return_code: Option<u32>,

    /// Plain or encrypted body
    pub payload: Bytes,
}

impl Frame {
    /// Create a request frame
    pub fn new(opcode: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            seqno: 0,
            opcode,
            return_code: None,
            payload: payload.into(),
        }
    }

    /// Attach a return code, as devices do
    pub fn with_return_code(mut self, return_code: u32) -> Self {
        self.return_code = Some(return_code);
        self
    }

    /// Value of the length word
    pub fn length_field(&self) -> usize {
        let return_code = if self.return_code.is_some() { RETURN_CODE_SIZE } else { 0 };
        return_code + self.payload.len() + TRAILER_SIZE
    }

    /// Encode frame to bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] when the length word would exceed
    /// [`MAX_FRAME_LENGTH`].
    pub fn encode(&self) -> Result<BytesMut> {
        let length = self.length_field();
        if length > MAX_FRAME_LENGTH {
            return Err(Error::PayloadTooLarge {
                size: length,
                max: MAX_FRAME_LENGTH,
            });
        }

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + length);

        buf.put_u32(PREFIX_MAGIC);
        buf.put_u32(self.seqno);
        buf.put_u32(self.opcode as u32);
        buf.put_u32(length as u32);

        if let Some(return_code) = self.return_code {
            buf.put_u32(return_code);
        }
        buf.put_slice(&self.payload);

        let crc = checksum::calculate(&buf);
        buf.put_u32(crc);
        buf.put_u32(SUFFIX_MAGIC);

        Ok(buf)
    }

    /// Decode a frame without return code (host to device)
    pub fn decode(buf: &[u8], check: CrcCheck) -> Result<Self> {
        Self::decode_inner(buf, false, check)
    }

    /// Decode a device frame (TCP reply or discovery broadcast)
    pub fn decode_response(buf: &[u8], check: CrcCheck) -> Result<Self> {
        Self::decode_inner(buf, true, check)
    }

    fn decode_inner(buf: &[u8], has_return_code: bool, check: CrcCheck) -> Result<Self> {
        let return_code_size = if has_return_code { RETURN_CODE_SIZE } else { 0 };
        let minimum = HEADER_SIZE + return_code_size + TRAILER_SIZE;

        if buf.len() < minimum {
            return Err(Error::FrameTooShort {
                expected: minimum,
                actual: buf.len(),
            });
        }

        let prefix = BigEndian::read_u32(&buf[0..4]);
        if prefix != PREFIX_MAGIC {
            return Err(Error::BadMagic {
                expected: PREFIX_MAGIC,
                found: prefix,
            });
        }

        let seqno = BigEndian::read_u32(&buf[4..8]);
        let command = BigEndian::read_u32(&buf[8..12]);
        let length = BigEndian::read_u32(&buf[12..16]) as usize;
        let total = HEADER_SIZE + length;

        if length < return_code_size + TRAILER_SIZE || buf.len() < total {
            return Err(Error::FrameTooShort {
                expected: total.max(minimum),
                actual: buf.len(),
            });
        }

        let body_end = total - TRAILER_SIZE;
        let received = BigEndian::read_u32(&buf[body_end..body_end + 4]);
        let suffix = BigEndian::read_u32(&buf[body_end + 4..total]);
        if suffix != SUFFIX_MAGIC {
            return Err(Error::BadMagic {
                expected: SUFFIX_MAGIC,
                found: suffix,
            });
        }

        if check == CrcCheck::Strict {
            let expected = checksum::calculate(&buf[..body_end]);
            if expected != received {
                return Err(Error::ChecksumMismatch { expected, received });
            }
        }

        if buf.len() > total {
            trace!("Ignoring {} trailing bytes after frame", buf.len() - total);
        }

        let return_code = has_return_code.then(|| BigEndian::read_u32(&buf[16..20]));
        let payload = Bytes::copy_from_slice(&buf[HEADER_SIZE + return_code_size..body_end]);

        Ok(Self {
            seqno,
            opcode: (command & 0xFF) as u8,
            return_code,
            payload,
        })
    }

    /// Get total frame size
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.length_field()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("seqno", &self.seqno)
            .field("opcode", &format!("0x{:02X} ({})", self.opcode, opcodes::name(self.opcode)))
            .field("return_code", &self.return_code)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[{}](seq={}, len={})",
            opcodes::name(self.opcode),
            self.seqno,
            self.payload.len()
        )
    }
}
