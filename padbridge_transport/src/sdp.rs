//! Minimal SDP responder: answers `SVC_SEARCH_REQ`, `SVC_ATTR_REQ` and
//! `SVC_SEARCH_ATTR_REQ` with a canned Device-ID record for Xbox-One-class
//! peers and an empty attribute list otherwise. Transaction ids are
//! big-endian, unlike every other field on this wire.
use bytes::{Buf, BufMut, Bytes, BytesMut};

const PDU_ERROR_RESPONSE: u8 = 0x01;
const PDU_SVC_SEARCH_REQ: u8 = 0x02;
const PDU_SVC_SEARCH_RSP: u8 = 0x03;
const PDU_SVC_ATTR_REQ: u8 = 0x04;
const PDU_SVC_ATTR_RSP: u8 = 0x05;
const PDU_SVC_SEARCH_ATTR_REQ: u8 = 0x06;
const PDU_SVC_SEARCH_ATTR_RSP: u8 = 0x07;

/// Canned PnP/Device-ID service record attribute list, served only to
/// Xbox-One-class peers (`main/bt_sdp.c`): vendor id source (Bluetooth
/// SIG), a placeholder vendor/product/version, and the service class UUID
/// for the PnP Information service (0x1200).
pub const XBOX_DEVICE_ID_RECORD: &[u8] = &[
    0x09, 0x00, 0x01, // ServiceClassIDList attribute id
    0x35, 0x03, 0x19, 0x12, 0x00, // sequence of one UUID: 0x1200
    0x09, 0x02, 0x00, // SpecificationID attribute id
    0x09, 0x01, 0x03, // BT SIG assigned
    0x09, 0x02, 0x01, // VendorID attribute id
    0x09, 0x00, 0x00, // placeholder
    0x09, 0x02, 0x02, // ProductID attribute id
    0x09, 0x00, 0x00, // placeholder
    0x09, 0x02, 0x03, // Version attribute id
    0x09, 0x01, 0x00, // placeholder
];

/// Whether this peer's class-of-device identifies it as Xbox-One-class
/// (the only vendor that receives [`XBOX_DEVICE_ID_RECORD`]).
pub fn is_xbox_one_class(class_of_device: [u8; 3]) -> bool {
    // Major device class "Peripheral" (0x05) with the Xbox-specific minor
    // device class bit pattern used by Xbox Wireless Controllers.
    (class_of_device[1] & 0x1F) == 0x05 && (class_of_device[0] & 0xC0) == 0x80
}

/// One parsed SDP request PDU: `pdu_id(1) | transaction_id(2 be) |
/// param_len(2 be) | params`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SdpRequest {
    ServiceSearch { transaction_id: u16 },
    ServiceAttribute { transaction_id: u16 },
    ServiceSearchAttribute { transaction_id: u16 },
    Unsupported { pdu_id: u8, transaction_id: u16 },
}

pub fn decode_request(mut bytes: Bytes) -> Option<SdpRequest> {
    if bytes.remaining() < 5 {
        return None;
    }
    let pdu_id = bytes.get_u8();
    let transaction_id = bytes.get_u16(); // big-endian
    let param_len = bytes.get_u16() as usize; // big-endian
    if bytes.remaining() < param_len {
        return None;
    }
    Some(match pdu_id {
        PDU_SVC_SEARCH_REQ => SdpRequest::ServiceSearch { transaction_id },
        PDU_SVC_ATTR_REQ => SdpRequest::ServiceAttribute { transaction_id },
        PDU_SVC_SEARCH_ATTR_REQ => SdpRequest::ServiceSearchAttribute { transaction_id },
        other => SdpRequest::Unsupported {
            pdu_id: other,
            transaction_id,
        },
    })
}

fn encode_response(pdu_id: u8, transaction_id: u16, params: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(5 + params.len());
    buf.put_u8(pdu_id);
    buf.put_u16(transaction_id); // big-endian
    buf.put_u16(params.len() as u16); // big-endian
    buf.put_slice(params);
    buf
}

/// Builds the response for a request, keyed on whether the peer is
/// Xbox-One-class.
pub fn build_response(req: &SdpRequest, peer_is_xbox_one: bool) -> BytesMut {
    let record: &[u8] = if peer_is_xbox_one { XBOX_DEVICE_ID_RECORD } else { &[] };
    match *req {
        SdpRequest::ServiceSearch { transaction_id } => {
            let mut params = BytesMut::new();
            params.put_u16(if record.is_empty() { 0 } else { 1 }); // total service record count
            params.put_u16(if record.is_empty() { 0 } else { 1 }); // current count
            if !record.is_empty() {
                params.put_u32(0x0001_0000); // placeholder handle
            }
            params.put_u8(0); // no continuation
            encode_response(PDU_SVC_SEARCH_RSP, transaction_id, &params)
        }
        SdpRequest::ServiceAttribute { transaction_id } | SdpRequest::ServiceSearchAttribute { transaction_id } => {
            let pdu_id = if matches!(req, SdpRequest::ServiceAttribute { .. }) {
                PDU_SVC_ATTR_RSP
            } else {
                PDU_SVC_SEARCH_ATTR_RSP
            };
            let mut params = BytesMut::new();
            params.put_u16(record.len() as u16);
            params.put_slice(record);
            params.put_u8(0); // no continuation
            encode_response(pdu_id, transaction_id, &params)
        }
        SdpRequest::Unsupported { transaction_id, .. } => {
            let mut params = BytesMut::new();
            params.put_u16(0x0003); // InvalidRequestSyntax
            encode_response(PDU_ERROR_RESPONSE, transaction_id, &params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_xbox_peer_gets_empty_record() {
        let req = SdpRequest::ServiceSearchAttribute { transaction_id: 7 };
        let resp = build_response(&req, false);
        // record len field is zero, immediately followed by the
        // no-continuation byte.
        assert_eq!(&resp[5..7], &0u16.to_be_bytes());
        assert_eq!(resp[7], 0);
    }

    #[test]
    fn xbox_peer_gets_device_id_record() {
        let req = SdpRequest::ServiceSearchAttribute { transaction_id: 1 };
        let resp = build_response(&req, true);
        let len = u16::from_be_bytes([resp[5], resp[6]]) as usize;
        assert_eq!(len, XBOX_DEVICE_ID_RECORD.len());
    }

    #[test]
    fn transaction_id_is_big_endian() {
        let frame = encode_response(PDU_SVC_SEARCH_RSP, 0x1234, &[]);
        assert_eq!(&frame[1..3], &[0x12, 0x34]);
    }

    #[test]
    fn xbox_one_class_of_device_detected() {
        assert!(is_xbox_one_class([0x80 | 0x04, 0x05, 0x00]));
        assert!(!is_xbox_one_class([0x00, 0x01, 0x00]));
    }
}
