//! L2CAP BR/EDR signalling subset needed for HID: channel
//! connect/configure/disconnect, plus a trivial information responder.
//! Runs as a protocol layer over the ACL stream the HCI layer hands up,
//! not over a kernel L2CAP socket (that raw-socket path lives in
//! [`crate::sock::l2cap`] and is used only by the wire-driver side).
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// PSMs used by this bridge.
pub const PSM_SDP: u16 = 0x0001;
pub const PSM_HID_CONTROL: u16 = 0x0011;
pub const PSM_HID_INTERRUPT: u16 = 0x0013;

const CODE_COMMAND_REJECT: u8 = 0x01;
const CODE_CONNECTION_REQUEST: u8 = 0x02;
const CODE_CONNECTION_RESPONSE: u8 = 0x03;
const CODE_CONFIGURE_REQUEST: u8 = 0x04;
const CODE_CONFIGURE_RESPONSE: u8 = 0x05;
const CODE_DISCONNECTION_REQUEST: u8 = 0x06;
const CODE_DISCONNECTION_RESPONSE: u8 = 0x07;
const CODE_INFORMATION_REQUEST: u8 = 0x0A;
const CODE_INFORMATION_RESPONSE: u8 = 0x0B;

/// MTU configuration option type.
const OPT_MTU: u8 = 0x01;

/// Proposed outbound MTU.
pub const PROPOSED_MTU: u16 = 0xFFFF;
/// Ceiling we accept from a peer's configure request.
pub const ACCEPTED_MTU_MAX: u16 = 0x02A0;

/// Per-device monotonic L2CAP signalling identifier, shared across a
/// device's three channels.
#[derive(Debug, Default, Clone)]
pub struct IdentifierCounter(Arc<AtomicU8>);

impl IdentifierCounter {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(1)))
    }

    /// Identifiers are 1..=255; 0 is reserved.
    pub fn next(&self) -> u8 {
        loop {
            let prev = self.0.fetch_add(1, Ordering::AcqRel);
            if prev != 0 {
                return prev;
            }
        }
    }
}

/// Channel lifecycle: `IDLE -> CONN_REQ_SENT -> CONNECTED ->
/// LCONF_SENT -> LCONF_DONE ∧ RCONF_DONE -> OPEN -> CLOSING -> IDLE`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelState {
    Idle,
    ConnReqSent,
    Connected,
    LconfSent { lconf_done: bool, rconf_done: bool },
    Open,
    Closing,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigError {
    UnexpectedTransition { state: ChannelState, event: &'static str },
}

/// One signalling channel: SDP, HID-control, or HID-interrupt for a given
/// device. Each active device owns three of these.
#[derive(Clone, Debug)]
pub struct Channel {
    pub psm: u16,
    pub scid: u16,
    pub dcid: Option<u16>,
    pub state: ChannelState,
    ids: IdentifierCounter,
}

impl Channel {
    /// `scid` low nibble encodes the device slot so inbound frames route
    /// in O(1): `scid = (slot & 0xF) | base`.
    pub fn new(psm: u16, slot: u8, base: u16, ids: IdentifierCounter) -> Self {
        Self {
            psm,
            scid: (slot as u16 & 0xF) | base,
            dcid: None,
            state: ChannelState::Idle,
            ids,
        }
    }

    /// Builds and encodes a Connection Request, transitioning to
    /// `CONN_REQ_SENT`.
    pub fn connect(&mut self) -> (u8, BytesMut) {
        debug_assert_eq!(self.state, ChannelState::Idle);
        self.state = ChannelState::ConnReqSent;
        let ident = self.ids.next();
        let mut params = BytesMut::with_capacity(4);
        params.put_u16_le(self.psm);
        params.put_u16_le(self.scid);
        (ident, encode_command(CODE_CONNECTION_REQUEST, ident, &params))
    }

    /// Applies an inbound Connection Response. On success moves to
    /// `CONNECTED`; any non-zero result is treated as a terminal failure
    /// back to `IDLE`. A pending result is treated as an intermediate
    /// state: no flag advances until a terminal success/failure response
    /// arrives.
    pub fn on_connection_response(&mut self, dcid: u16, result: u16) -> Result<(), SigError> {
        if self.state != ChannelState::ConnReqSent {
            return Err(SigError::UnexpectedTransition {
                state: self.state,
                event: "connection_response",
            });
        }
        if result == 0 {
            self.dcid = Some(dcid);
            self.state = ChannelState::Connected;
        } else {
            self.state = ChannelState::Idle;
        }
        Ok(())
    }

    /// Builds and encodes a Configure Request proposing [`PROPOSED_MTU`],
    /// transitioning to `LCONF_SENT`.
    pub fn configure(&mut self) -> Result<(u8, BytesMut), SigError> {
        if self.state != ChannelState::Connected {
            return Err(SigError::UnexpectedTransition {
                state: self.state,
                event: "configure",
            });
        }
        self.state = ChannelState::LconfSent {
            lconf_done: false,
            rconf_done: false,
        };
        let ident = self.ids.next();
        let dcid = self.dcid.expect("connected channel has a dcid");
        let mut params = BytesMut::with_capacity(8);
        params.put_u16_le(dcid);
        params.put_u16_le(0); // flags
        params.put_u8(OPT_MTU);
        params.put_u8(2);
        params.put_u16_le(PROPOSED_MTU);
        Ok((ident, encode_command(CODE_CONFIGURE_REQUEST, ident, &params)))
    }

    /// Our Configure Request was acknowledged: marks `LCONF_DONE`, moving
    /// to `OPEN` only once `RCONF_DONE` has also been observed
    /// (`LCONF_DONE ∧ RCONF_DONE -> OPEN`).
    pub fn on_configure_response(&mut self) -> Result<(), SigError> {
        match self.state {
            ChannelState::LconfSent { rconf_done, .. } => {
                self.state = if rconf_done {
                    ChannelState::Open
                } else {
                    ChannelState::LconfSent {
                        lconf_done: true,
                        rconf_done: false,
                    }
                };
                Ok(())
            }
            other => Err(SigError::UnexpectedTransition {
                state: other,
                event: "configure_response",
            }),
        }
    }

    /// Peer sent its own Configure Request; we always answer with the MTU
    /// option, clamped to [`ACCEPTED_MTU_MAX`], and mark `RCONF_DONE`,
    /// moving to `OPEN` only once `LCONF_DONE` has also been observed.
    pub fn on_peer_configure_request(&mut self, ident: u8, requested_mtu: u16) -> BytesMut {
        let accepted = requested_mtu.min(ACCEPTED_MTU_MAX);
        if let ChannelState::LconfSent { lconf_done, .. } = self.state {
            self.state = if lconf_done {
                ChannelState::Open
            } else {
                ChannelState::LconfSent {
                    lconf_done: false,
                    rconf_done: true,
                }
            };
        } else if self.state == ChannelState::Connected {
            // Peer configured before we issued our own request; park the
            // acknowledgement, `configure()` will still run LCONF_SENT.
            self.state = ChannelState::LconfSent {
                lconf_done: false,
                rconf_done: true,
            };
        }
        let mut params = BytesMut::with_capacity(8);
        params.put_u16_le(self.scid);
        params.put_u16_le(0); // flags
        params.put_u16_le(0); // result: success
        params.put_u8(OPT_MTU);
        params.put_u8(2);
        params.put_u16_le(accepted);
        encode_command(CODE_CONFIGURE_RESPONSE, ident, &params)
    }

    pub fn disconnect(&mut self) -> (u8, BytesMut) {
        self.state = ChannelState::Closing;
        let ident = self.ids.next();
        let dcid = self.dcid.unwrap_or(0);
        let mut params = BytesMut::with_capacity(4);
        params.put_u16_le(dcid);
        params.put_u16_le(self.scid);
        (ident, encode_command(CODE_DISCONNECTION_REQUEST, ident, &params))
    }

    pub fn on_disconnection_response(&mut self) {
        self.state = ChannelState::Idle;
        self.dcid = None;
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }
}

fn encode_command(code: u8, ident: u8, params: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4 + params.len());
    buf.put_u8(code);
    buf.put_u8(ident);
    buf.put_u16_le(params.len() as u16);
    buf.put_slice(params);
    buf
}

/// Trivial Information Response: we report no extended features, which is
/// sufficient for HID-only peers.
pub fn encode_information_response(ident: u8, info_type: u16) -> BytesMut {
    let mut params = BytesMut::with_capacity(4);
    params.put_u16_le(info_type);
    params.put_u16_le(0); // result: success
    encode_command(CODE_INFORMATION_RESPONSE, ident, &params)
}

pub fn encode_command_reject(ident: u8, reason: u16) -> BytesMut {
    let mut params = BytesMut::with_capacity(2);
    params.put_u16_le(reason);
    encode_command(CODE_COMMAND_REJECT, ident, &params)
}

/// One decoded inbound signalling PDU.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SigPdu {
    ConnectionRequest { ident: u8, psm: u16, scid: u16 },
    ConnectionResponse { ident: u8, dcid: u16, scid: u16, result: u16 },
    ConfigureRequest { ident: u8, dcid: u16, requested_mtu: u16 },
    ConfigureResponse { ident: u8 },
    DisconnectionRequest { ident: u8, dcid: u16, scid: u16 },
    DisconnectionResponse { ident: u8 },
    InformationRequest { ident: u8, info_type: u16 },
    Unknown { code: u8, ident: u8 },
}

/// Decodes one signalling command from an L2CAP-signalling-channel PDU
/// (`code(1) | ident(1) | len(2) | data`).
pub fn decode_pdu(mut bytes: Bytes) -> Option<SigPdu> {
    if bytes.remaining() < 4 {
        return None;
    }
    let code = bytes.get_u8();
    let ident = bytes.get_u8();
    let len = bytes.get_u16_le() as usize;
    if bytes.remaining() < len {
        return None;
    }
    let mut data = bytes.split_to(len);
    Some(match code {
        CODE_CONNECTION_REQUEST if data.remaining() >= 4 => SigPdu::ConnectionRequest {
            ident,
            psm: data.get_u16_le(),
            scid: data.get_u16_le(),
        },
        CODE_CONNECTION_RESPONSE if data.remaining() >= 6 => SigPdu::ConnectionResponse {
            ident,
            dcid: data.get_u16_le(),
            scid: data.get_u16_le(),
            result: data.get_u16_le(),
        },
        CODE_CONFIGURE_REQUEST if data.remaining() >= 4 => {
            let dcid = data.get_u16_le();
            data.advance(2); // flags
            let mut requested_mtu = PROPOSED_MTU;
            while data.remaining() >= 2 {
                let opt_type = data.get_u8();
                let opt_len = data.get_u8() as usize;
                if data.remaining() < opt_len {
                    break;
                }
                if opt_type == OPT_MTU && opt_len == 2 {
                    requested_mtu = data.get_u16_le();
                } else {
                    data.advance(opt_len);
                }
            }
            SigPdu::ConfigureRequest {
                ident,
                dcid,
                requested_mtu,
            }
        }
        CODE_CONFIGURE_RESPONSE => SigPdu::ConfigureResponse { ident },
        CODE_DISCONNECTION_REQUEST if data.remaining() >= 4 => SigPdu::DisconnectionRequest {
            ident,
            dcid: data.get_u16_le(),
            scid: data.get_u16_le(),
        },
        CODE_DISCONNECTION_RESPONSE => SigPdu::DisconnectionResponse { ident },
        CODE_INFORMATION_REQUEST if data.remaining() >= 2 => SigPdu::InformationRequest {
            ident,
            info_type: data.get_u16_le(),
        },
        _ => SigPdu::Unknown { code, ident },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scid_low_nibble_encodes_device_slot() {
        let ch = Channel::new(PSM_HID_CONTROL, 5, 0x0040, IdentifierCounter::new());
        assert_eq!(ch.scid & 0xF, 5);
    }

    #[test]
    fn channel_progresses_idle_to_open() {
        let ids = IdentifierCounter::new();
        let mut ch = Channel::new(PSM_SDP, 0, 0x0040, ids);
        assert_eq!(ch.state, ChannelState::Idle);
        ch.connect();
        assert_eq!(ch.state, ChannelState::ConnReqSent);
        ch.on_connection_response(0x50, 0).unwrap();
        assert_eq!(ch.state, ChannelState::Connected);
        ch.configure().unwrap();
        assert!(matches!(ch.state, ChannelState::LconfSent { .. }));
        // peer configures us before our own request is acked.
        ch.on_peer_configure_request(7, 0xFFFF);
        ch.on_configure_response().unwrap();
        assert!(ch.is_open());
    }

    #[test]
    fn configure_response_alone_does_not_open_the_channel() {
        let ids = IdentifierCounter::new();
        let mut ch = Channel::new(PSM_SDP, 1, 0x0040, ids);
        ch.state = ChannelState::Connected;
        ch.configure().unwrap();
        // Our own request was acked, but the peer hasn't sent its
        // Configure Request yet: LCONF_DONE alone must not open the channel.
        ch.on_configure_response().unwrap();
        assert!(!ch.is_open());
        assert_eq!(
            ch.state,
            ChannelState::LconfSent {
                lconf_done: true,
                rconf_done: false,
            }
        );
        ch.on_peer_configure_request(9, 0xFFFF);
        assert!(ch.is_open());
    }

    #[test]
    fn peer_mtu_request_is_clamped() {
        let mut ch = Channel::new(PSM_HID_INTERRUPT, 2, 0x0040, IdentifierCounter::new());
        ch.state = ChannelState::Connected;
        let resp = ch.on_peer_configure_request(1, 0xFFFF);
        // result field success(0) is two bytes before the MTU option.
        assert_eq!(&resp[10..12], &ACCEPTED_MTU_MAX.to_le_bytes());
    }

    #[test]
    fn connection_request_round_trips() {
        let ids = IdentifierCounter::new();
        let mut ch = Channel::new(PSM_SDP, 3, 0x0040, ids);
        let (ident, frame) = ch.connect();
        let pdu = decode_pdu(frame.freeze()).unwrap();
        assert_eq!(
            pdu,
            SigPdu::ConnectionRequest {
                ident,
                psm: PSM_SDP,
                scid: ch.scid,
            }
        );
    }

    #[test]
    fn identifier_counter_never_yields_zero() {
        let ids = IdentifierCounter::new();
        for _ in 0..300 {
            assert_ne!(ids.next(), 0);
        }
    }
}
