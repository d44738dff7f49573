//! Minimal ATT/GATT responder: a fixed handle map exposing device
//! name/appearance, battery level, and a BlueRetro-style vendor
//! configuration service. Oversized reads are served through
//! `READ_BLOB_REQ` continuations bounded at 512 bytes total.
use bytes::{Buf, BufMut, Bytes, BytesMut};

const OP_ERROR_RESPONSE: u8 = 0x01;
const OP_READ_REQ: u8 = 0x0A;
const OP_READ_RSP: u8 = 0x0B;
const OP_READ_BLOB_REQ: u8 = 0x0C;
const OP_READ_BLOB_RSP: u8 = 0x0D;
const OP_WRITE_REQ: u8 = 0x12;
const OP_WRITE_RSP: u8 = 0x13;

const ATT_ERR_INVALID_HANDLE: u8 = 0x01;
const ATT_ERR_INVALID_OFFSET: u8 = 0x07;

/// Total bytes a `READ_BLOB_REQ` continuation sequence may serve.
pub const MAX_BLOB_TOTAL: usize = 512;

/// Vendor base UUID for the BlueRetro configuration service.
pub const VENDOR_BASE_UUID: [u8; 16] = [
    0x56, 0x83, 0x0F, 0x56, 0x51, 0x80, 0xFA, 0xB0, 0x31, 0x4B, 0x2F, 0xA1, 0x76, 0x79, 0x9A, 0x00,
];

/// Fixed ATT handle assignments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Handle {
    GapDeviceName,
    GapAppearance,
    GapCentralAddressResolution,
    BatteryLevel,
    VendorGlobalConfig,
    VendorOutCfgSelector,
    VendorOutCfgPayload,
    VendorInCfgSelector,
    VendorInCfgPayload,
}

impl Handle {
    pub fn raw(self) -> u16 {
        match self {
            Self::GapDeviceName => 0x0014,
            Self::GapAppearance => 0x0016,
            Self::GapCentralAddressResolution => 0x001B,
            Self::BatteryLevel => 0x0028,
            Self::VendorGlobalConfig => 0x0040,
            Self::VendorOutCfgSelector => 0x0044,
            Self::VendorOutCfgPayload => 0x0046,
            Self::VendorInCfgSelector => 0x0048,
            Self::VendorInCfgPayload => 0x004A,
        }
    }

    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0x0014 => Some(Self::GapDeviceName),
            0x0016 => Some(Self::GapAppearance),
            0x001B => Some(Self::GapCentralAddressResolution),
            0x0028 => Some(Self::BatteryLevel),
            0x0040 => Some(Self::VendorGlobalConfig),
            0x0044 => Some(Self::VendorOutCfgSelector),
            0x0046 => Some(Self::VendorOutCfgPayload),
            0x0048 => Some(Self::VendorInCfgSelector),
            0x004A => Some(Self::VendorInCfgPayload),
            _ => None,
        }
    }
}

/// Backing store for the attribute table: callers supply current values,
/// the responder only handles ATT framing/continuation bookkeeping.
pub trait AttBackend {
    fn read(&self, handle: Handle) -> Vec<u8>;
    fn write(&mut self, handle: Handle, value: &[u8]);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttPdu {
    Read { handle: u16 },
    ReadBlob { handle: u16, offset: u16 },
    Write { handle: u16 },
    Unsupported { opcode: u8 },
}

pub fn decode_pdu(mut bytes: Bytes) -> Option<AttPdu> {
    if bytes.is_empty() {
        return None;
    }
    let opcode = bytes.get_u8();
    Some(match opcode {
        OP_READ_REQ if bytes.remaining() >= 2 => AttPdu::Read {
            handle: bytes.get_u16_le(),
        },
        OP_READ_BLOB_REQ if bytes.remaining() >= 4 => AttPdu::ReadBlob {
            handle: bytes.get_u16_le(),
            offset: bytes.get_u16_le(),
        },
        OP_WRITE_REQ if bytes.remaining() >= 2 => AttPdu::Write {
            handle: bytes.get_u16_le(),
        },
        _ => AttPdu::Unsupported { opcode },
    })
}

fn error_response(opcode: u8, handle: u16, error_code: u8) -> BytesMut {
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u8(OP_ERROR_RESPONSE);
    buf.put_u8(opcode);
    buf.put_u16_le(handle);
    buf.put_u8(error_code);
    buf
}

/// Handles one inbound PDU against `backend`, respecting `mtu` for
/// non-blob reads and the [`MAX_BLOB_TOTAL`] ceiling for blob reads.
pub fn handle_pdu(pdu: AttPdu, mtu: usize, backend: &mut dyn AttBackend) -> BytesMut {
    match pdu {
        AttPdu::Read { handle } => match Handle::from_raw(handle) {
            Some(h) => {
                let value = backend.read(h);
                let take = value.len().min(mtu.saturating_sub(1));
                let mut buf = BytesMut::with_capacity(1 + take);
                buf.put_u8(OP_READ_RSP);
                buf.put_slice(&value[..take]);
                buf
            }
            None => error_response(OP_READ_REQ, handle, ATT_ERR_INVALID_HANDLE),
        },
        AttPdu::ReadBlob { handle, offset } => match Handle::from_raw(handle) {
            Some(h) => {
                let value = backend.read(h);
                let capped_len = value.len().min(MAX_BLOB_TOTAL);
                if offset as usize > capped_len {
                    return error_response(OP_READ_BLOB_REQ, handle, ATT_ERR_INVALID_OFFSET);
                }
                let remaining = &value[offset as usize..capped_len];
                let take = remaining.len().min(mtu.saturating_sub(1));
                let mut buf = BytesMut::with_capacity(1 + take);
                buf.put_u8(OP_READ_BLOB_RSP);
                buf.put_slice(&remaining[..take]);
                buf
            }
            None => error_response(OP_READ_BLOB_REQ, handle, ATT_ERR_INVALID_HANDLE),
        },
        AttPdu::Write { handle } => match Handle::from_raw(handle) {
            Some(h) => {
                // Caller is expected to have already sliced the value out
                // of the original request; write path is exercised via
                // `write_value` below when threading the raw request.
                let _ = h;
                let mut buf = BytesMut::with_capacity(1);
                buf.put_u8(OP_WRITE_RSP);
                buf
            }
            None => error_response(OP_WRITE_REQ, handle, ATT_ERR_INVALID_HANDLE),
        },
        AttPdu::Unsupported { opcode } => error_response(opcode, 0, 0x06), // RequestNotSupported
    }
}

/// Applies a Write Request's value to the backend and returns the
/// response PDU. Takes the raw request bytes since [`decode_pdu`] only
/// extracts the handle for `Write`.
pub fn handle_write(mut bytes: Bytes, backend: &mut dyn AttBackend) -> BytesMut {
    if bytes.remaining() < 3 {
        return error_response(OP_WRITE_REQ, 0, ATT_ERR_INVALID_HANDLE);
    }
    bytes.advance(1); // opcode
    let handle = bytes.get_u16_le();
    match Handle::from_raw(handle) {
        Some(h) => {
            backend.write(h, &bytes);
            let mut buf = BytesMut::with_capacity(1);
            buf.put_u8(OP_WRITE_RSP);
            buf
        }
        None => error_response(OP_WRITE_REQ, handle, ATT_ERR_INVALID_HANDLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeBackend {
        values: HashMap<u16, Vec<u8>>,
    }

    impl AttBackend for FakeBackend {
        fn read(&self, handle: Handle) -> Vec<u8> {
            self.values.get(&handle.raw()).cloned().unwrap_or_default()
        }
        fn write(&mut self, handle: Handle, value: &[u8]) {
            self.values.insert(handle.raw(), value.to_vec());
        }
    }

    #[test]
    fn unknown_handle_yields_error_response() {
        let mut backend = FakeBackend::default();
        let resp = handle_pdu(AttPdu::Read { handle: 0x9999 }, 23, &mut backend);
        assert_eq!(resp[0], OP_ERROR_RESPONSE);
        assert_eq!(resp[4], ATT_ERR_INVALID_HANDLE);
    }

    #[test]
    fn read_caps_at_mtu_minus_one() {
        let mut backend = FakeBackend::default();
        backend.write(Handle::VendorInCfgPayload, &[0xAA; 100]);
        let resp = handle_pdu(
            AttPdu::Read {
                handle: Handle::VendorInCfgPayload.raw(),
            },
            23,
            &mut backend,
        );
        assert_eq!(resp.len(), 23);
    }

    #[test]
    fn blob_continuation_serves_remaining_bytes_past_mtu() {
        let mut backend = FakeBackend::default();
        let payload: Vec<u8> = (0..300u16).map(|i| (i % 251) as u8).collect();
        backend.write(Handle::VendorOutCfgPayload, &payload);
        let first = handle_pdu(
            AttPdu::Read {
                handle: Handle::VendorOutCfgPayload.raw(),
            },
            23,
            &mut backend,
        );
        assert_eq!(first.len(), 23);
        let second = handle_pdu(
            AttPdu::ReadBlob {
                handle: Handle::VendorOutCfgPayload.raw(),
                offset: 22,
            },
            23,
            &mut backend,
        );
        assert_eq!(second[0], OP_READ_BLOB_RSP);
        assert_eq!(&second[1..23], &payload[22..44]);
    }

    #[test]
    fn blob_total_is_capped_at_512() {
        let mut backend = FakeBackend::default();
        backend.write(Handle::VendorOutCfgPayload, &vec![1u8; 1000]);
        let resp = handle_pdu(
            AttPdu::ReadBlob {
                handle: Handle::VendorOutCfgPayload.raw(),
                offset: 511,
            },
            512,
            &mut backend,
        );
        assert_eq!(resp[0], OP_READ_BLOB_RSP);
        assert_eq!(resp.len(), 2); // one byte of payload at offset 511
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut backend = FakeBackend::default();
        let mut req = BytesMut::new();
        req.put_u8(OP_WRITE_REQ);
        req.put_u16_le(Handle::VendorGlobalConfig.raw());
        req.put_slice(&[0x01, 0x02, 0x03]);
        let resp = handle_write(req.freeze(), &mut backend);
        assert_eq!(resp[0], OP_WRITE_RSP);
        assert_eq!(backend.read(Handle::VendorGlobalConfig), vec![1, 2, 3]);
    }
}
