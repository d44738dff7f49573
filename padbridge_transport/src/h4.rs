//! H4 packet framing: the one-byte packet-type prefix used to multiplex
//! HCI commands, ACL data, SCO data and events onto a single byte stream,
//! plus the `{0xFF, delay_ms}` sentinel consumed by the command pump to
//! sequence HID bring-up delays.
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// H4 packet type prefix: `{CMD=1, ACL=2, SCO=3, EVT=4}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[repr(u8)]
pub enum H4Type {
    Command = 1,
    Acl = 2,
    Sco = 3,
    Event = 4,
}

impl H4Type {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Command),
            2 => Some(Self::Acl),
            3 => Some(Self::Sco),
            4 => Some(Self::Event),
            _ => None,
        }
    }
}

/// Sentinel H4 type consumed by the TX pump rather than transmitted: a
/// `{0xFF, delay_ms}` pair that delays the next queued command, used to
/// sequence HID-init steps like the PS3 20ms grace.
pub const SENTINEL_TYPE: u8 = 0xFF;

/// HCI opcode: a 10-bit OGF (opcode group field) and 6-bit OCF (opcode
/// command field) packed into a little-endian `u16` on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Opcode {
    pub ogf: u8,
    pub ocf: u16,
}

impl Opcode {
    pub const fn new(ogf: u8, ocf: u16) -> Self {
        Self { ogf, ocf }
    }

    fn to_u16(self) -> u16 {
        ((self.ogf as u16) << 10) | (self.ocf & 0x03FF)
    }

    fn from_u16(raw: u16) -> Self {
        Self {
            ogf: (raw >> 10) as u8,
            ocf: raw & 0x03FF,
        }
    }
}

/// One decoded H4 frame, header fields already split from the payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum H4Frame {
    Command { opcode: Opcode, params: Bytes },
    Event { code: u8, params: Bytes },
    Acl { handle: u16, flags: u8, payload: Bytes },
    Sco { handle: u16, flags: u8, payload: Bytes },
    /// The `{0xFF, delay_ms}` sentinel.
    Delay(u8),
}

#[derive(Clone, Copy, Error, Debug, Eq, PartialEq)]
pub enum H4Error {
    #[error("unknown H4 packet type: {0:#x}")]
    UnknownType(u8),
    #[error("truncated frame")]
    Truncated,
}

/// `opcode(2) | param_len(1) | params…`.
pub fn encode_command(opcode: Opcode, params: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4 + params.len());
    buf.put_u8(H4Type::Command as u8);
    buf.put_u16_le(opcode.to_u16());
    buf.put_u8(params.len() as u8);
    buf.put_slice(params);
    buf
}

/// `handle_and_flags(2) | len(2) | payload`; `payload` is expected to
/// already contain the L2CAP `len(2) | cid(2) | data` framing produced by
/// [`crate::l2cap_sig`].
pub fn encode_acl(handle: u16, flags: u8, payload: &[u8]) -> BytesMut {
    let handle_and_flags = (handle & 0x0FFF) | ((flags as u16 & 0xF) << 12);
    let mut buf = BytesMut::with_capacity(5 + payload.len());
    buf.put_u8(H4Type::Acl as u8);
    buf.put_u16_le(handle_and_flags);
    buf.put_u16_le(payload.len() as u16);
    buf.put_slice(payload);
    buf
}

/// Encodes the `{0xFF, delay_ms}` sentinel consumed by the TX pump.
pub fn encode_delay(delay_ms: u8) -> [u8; 2] {
    [SENTINEL_TYPE, delay_ms]
}

/// Incremental H4 stream decoder: feed it raw bytes as they arrive and
/// drain complete frames. Buffers a partial frame across calls.
#[derive(Debug, Default)]
pub struct H4Reader {
    buf: BytesMut,
}

impl H4Reader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pops the next complete frame out of the buffer, if any.
    pub fn next_frame(&mut self) -> Result<Option<H4Frame>, H4Error> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let ty_byte = self.buf[0];
        if ty_byte == SENTINEL_TYPE {
            if self.buf.len() < 2 {
                return Ok(None);
            }
            let delay = self.buf[1];
            self.buf.advance(2);
            return Ok(Some(H4Frame::Delay(delay)));
        }
        let Some(ty) = H4Type::from_byte(ty_byte) else {
            self.buf.advance(1);
            return Err(H4Error::UnknownType(ty_byte));
        };
        match ty {
            H4Type::Command => {
                if self.buf.len() < 4 {
                    return Ok(None);
                }
                let param_len = self.buf[3] as usize;
                if self.buf.len() < 4 + param_len {
                    return Ok(None);
                }
                self.buf.advance(1);
                let opcode = Opcode::from_u16(self.buf.get_u16_le());
                let param_len = self.buf.get_u8() as usize;
                let params = self.buf.split_to(param_len).freeze();
                Ok(Some(H4Frame::Command { opcode, params }))
            }
            H4Type::Event => {
                if self.buf.len() < 3 {
                    return Ok(None);
                }
                let len = self.buf[2] as usize;
                if self.buf.len() < 3 + len {
                    return Ok(None);
                }
                self.buf.advance(1);
                let code = self.buf.get_u8();
                let len = self.buf.get_u8() as usize;
                let params = self.buf.split_to(len).freeze();
                Ok(Some(H4Frame::Event { code, params }))
            }
            H4Type::Acl => {
                if self.buf.len() < 5 {
                    return Ok(None);
                }
                let len = u16::from_le_bytes([self.buf[3], self.buf[4]]) as usize;
                if self.buf.len() < 5 + len {
                    return Ok(None);
                }
                self.buf.advance(1);
                let handle_and_flags = self.buf.get_u16_le();
                let len = self.buf.get_u16_le() as usize;
                let payload = self.buf.split_to(len).freeze();
                Ok(Some(H4Frame::Acl {
                    handle: handle_and_flags & 0x0FFF,
                    flags: ((handle_and_flags >> 12) & 0xF) as u8,
                    payload,
                }))
            }
            H4Type::Sco => {
                if self.buf.len() < 4 {
                    return Ok(None);
                }
                let len = self.buf[3] as usize;
                if self.buf.len() < 4 + len {
                    return Ok(None);
                }
                self.buf.advance(1);
                let handle_and_flags = self.buf.get_u16_le();
                let len = self.buf.get_u8() as usize;
                let payload = self.buf.split_to(len).freeze();
                Ok(Some(H4Frame::Sco {
                    handle: handle_and_flags & 0x0FFF,
                    flags: ((handle_and_flags >> 12) & 0xF) as u8,
                    payload,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips_through_u16() {
        let op = Opcode::new(0x03, 0x0001);
        assert_eq!(Opcode::from_u16(op.to_u16()), op);
    }

    #[test]
    fn command_round_trips_through_reader() {
        let frame = encode_command(Opcode::new(0x03, 0x0003), &[0xAA, 0xBB]);
        let mut reader = H4Reader::new();
        reader.feed(&frame);
        let decoded = reader.next_frame().unwrap().unwrap();
        assert_eq!(
            decoded,
            H4Frame::Command {
                opcode: Opcode::new(0x03, 0x0003),
                params: Bytes::from_static(&[0xAA, 0xBB]),
            }
        );
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn reader_buffers_partial_frames() {
        let frame = encode_command(Opcode::new(0x01, 0x0002), &[0x01, 0x02, 0x03]);
        let mut reader = H4Reader::new();
        reader.feed(&frame[..3]);
        assert_eq!(reader.next_frame().unwrap(), None);
        reader.feed(&frame[3..]);
        assert!(reader.next_frame().unwrap().is_some());
    }

    #[test]
    fn sentinel_delay_is_decoded() {
        let mut reader = H4Reader::new();
        reader.feed(&encode_delay(20));
        assert_eq!(reader.next_frame().unwrap(), Some(H4Frame::Delay(20)));
    }

    #[test]
    fn event_frame_round_trips() {
        let mut raw = vec![H4Type::Event as u8, 0x01, 0x02, 0xDE, 0xAD];
        let mut reader = H4Reader::new();
        reader.feed(&mut raw);
        assert_eq!(
            reader.next_frame().unwrap(),
            Some(H4Frame::Event {
                code: 0x01,
                params: Bytes::from_static(&[0xDE, 0xAD]),
            })
        );
    }
}
