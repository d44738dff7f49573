//! HCI command/event catalogue and the single-ring command pump: a closed
//! handler table dispatching inbound events by code, and an MPSC transmit
//! ring that serialises outbound commands gated by `CTRL_READY`. This sits
//! above [`crate::h4`] (byte framing) and below [`crate::l2cap_sig`].
use crate::h4::{self, Opcode};
use crate::Address;
use bytes::{Buf, Bytes};
use padbridge_shared::flags::{AtomicFlags, ControllerFlag};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;

/// OGF 0x03: host controller & baseband.
pub const OGF_HOST_CTL: u8 = 0x03;
/// OGF 0x01: link control.
pub const OGF_LINK_CTL: u8 = 0x01;
/// OGF 0x04: informational.
pub const OGF_INFO: u8 = 0x04;

pub const OCF_RESET: u16 = 0x0003;
pub const OCF_WRITE_LOCAL_NAME: u16 = 0x0013;
pub const OCF_WRITE_CLASS_OF_DEVICE: u16 = 0x0024;
pub const OCF_WRITE_SCAN_ENABLE: u16 = 0x001A;
pub const OCF_SET_EVENT_FILTER: u16 = 0x0005;
pub const OCF_READ_LOCAL_VERSION: u16 = 0x0001;
pub const OCF_INQUIRY: u16 = 0x0001;
pub const OCF_CREATE_CONNECTION: u16 = 0x0005;
pub const OCF_ACCEPT_CONNECTION_REQUEST: u16 = 0x0009;
pub const OCF_LINK_KEY_REQUEST_REPLY: u16 = 0x000B;
pub const OCF_LINK_KEY_REQUEST_NEG_REPLY: u16 = 0x000C;
pub const OCF_PIN_CODE_REQUEST_REPLY: u16 = 0x000D;
pub const OCF_IO_CAPABILITY_REQUEST_REPLY: u16 = 0x002B;
pub const OCF_USER_CONFIRMATION_REQUEST_REPLY: u16 = 0x002C;

const EVT_INQUIRY_COMPLETE: u8 = 0x01;
const EVT_INQUIRY_RESULT: u8 = 0x02;
const EVT_CONNECTION_COMPLETE: u8 = 0x03;
const EVT_CONNECTION_REQUEST: u8 = 0x04;
const EVT_DISCONNECTION_COMPLETE: u8 = 0x05;
const EVT_AUTHENTICATION_COMPLETE: u8 = 0x06;
const EVT_REMOTE_NAME_REQUEST_COMPLETE: u8 = 0x07;
const EVT_COMMAND_COMPLETE: u8 = 0x0E;
const EVT_COMMAND_STATUS: u8 = 0x0F;
const EVT_INQUIRY_RESULT_WITH_RSSI: u8 = 0x22;
const EVT_IO_CAPABILITY_REQUEST: u8 = 0x31;
const EVT_IO_CAPABILITY_RESPONSE: u8 = 0x32;
const EVT_USER_CONFIRMATION_REQUEST: u8 = 0x33;
const EVT_SIMPLE_PAIRING_COMPLETE: u8 = 0x36;
const EVT_LINK_KEY_NOTIFY: u8 = 0x18;
const EVT_LINK_KEY_REQUEST: u8 = 0x17;
const EVT_EXTENDED_INQUIRY_RESULT: u8 = 0x2F;

fn read_bdaddr(buf: &mut Bytes) -> Address {
    let mut raw = [0u8; 6];
    buf.copy_to_slice(&mut raw);
    raw.reverse();
    Address::new(raw)
}

/// One entry of an inquiry result report; `EVT_INQUIRY_RESULT` and its
/// RSSI/extended siblings all reduce to this shape for dispatch purposes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InquiryResult {
    pub bdaddr: Address,
    pub class_of_device: [u8; 3],
    pub rssi: Option<i8>,
}

/// Closed set of HCI events the host orchestrator reacts to. Events
/// outside this set are logged and dropped by [`parse_event`].
#[derive(Clone, Debug, PartialEq)]
pub enum HciEvent {
    InquiryResult(Vec<InquiryResult>),
    ConnectionComplete {
        status: u8,
        handle: u16,
        bdaddr: Address,
    },
    ConnectionRequest {
        bdaddr: Address,
        class_of_device: [u8; 3],
    },
    DisconnectionComplete {
        status: u8,
        handle: u16,
        reason: u8,
    },
    AuthenticationComplete {
        status: u8,
        handle: u16,
    },
    RemoteNameRequestComplete {
        status: u8,
        bdaddr: Address,
        name: String,
    },
    CommandComplete {
        opcode: Opcode,
        status: u8,
        return_params: Bytes,
    },
    CommandStatus {
        status: u8,
        opcode: Opcode,
    },
    LinkKeyRequest {
        bdaddr: Address,
    },
    LinkKeyNotify {
        bdaddr: Address,
        key: [u8; 16],
    },
    IoCapabilityRequest {
        bdaddr: Address,
    },
    IoCapabilityResponse {
        bdaddr: Address,
    },
    UserConfirmationRequest {
        bdaddr: Address,
    },
    SimplePairingComplete {
        status: u8,
        bdaddr: Address,
    },
    /// Event code recognised but outside the closed set we act on, or a
    /// code we don't recognise at all. Logged and dropped.
    Unknown(u8),
}

/// Parses one HCI event body against the closed handler table. Never
/// fails: unparseable bodies for a known code still surface as
/// [`HciEvent::Unknown`] rather than propagating an error — unknown HCI
/// events and opcodes are logged and ignored, not treated as errors.
pub fn parse_event(code: u8, mut params: Bytes) -> HciEvent {
    match code {
        EVT_INQUIRY_RESULT | EVT_INQUIRY_RESULT_WITH_RSSI | EVT_EXTENDED_INQUIRY_RESULT => {
            if params.is_empty() {
                return HciEvent::Unknown(code);
            }
            let count = params.get_u8() as usize;
            let mut results = Vec::with_capacity(count);
            let with_rssi = code != EVT_INQUIRY_RESULT;
            for _ in 0..count {
                if params.remaining() < 6 {
                    break;
                }
                let bdaddr = read_bdaddr(&mut params);
                // skip page_scan_repetition_mode(+reserved fields) up to class_of_device.
                let skip = if code == EVT_EXTENDED_INQUIRY_RESULT { 7 } else { 4 };
                if params.remaining() < skip + 3 {
                    break;
                }
                params.advance(skip);
                let mut cod = [0u8; 3];
                params.copy_to_slice(&mut cod);
                let rssi = if with_rssi && params.remaining() >= 3 {
                    params.advance(2);
                    Some(params.get_i8())
                } else {
                    None
                };
                results.push(InquiryResult {
                    bdaddr,
                    class_of_device: cod,
                    rssi,
                });
            }
            HciEvent::InquiryResult(results)
        }
        EVT_CONNECTION_COMPLETE => {
            if params.remaining() < 9 {
                return HciEvent::Unknown(code);
            }
            let status = params.get_u8();
            let handle = params.get_u16_le();
            let bdaddr = read_bdaddr(&mut params);
            HciEvent::ConnectionComplete {
                status,
                handle,
                bdaddr,
            }
        }
        EVT_CONNECTION_REQUEST => {
            if params.remaining() < 9 {
                return HciEvent::Unknown(code);
            }
            let bdaddr = read_bdaddr(&mut params);
            let mut cod = [0u8; 3];
            params.copy_to_slice(&mut cod);
            HciEvent::ConnectionRequest {
                bdaddr,
                class_of_device: cod,
            }
        }
        EVT_DISCONNECTION_COMPLETE => {
            if params.remaining() < 4 {
                return HciEvent::Unknown(code);
            }
            let status = params.get_u8();
            let handle = params.get_u16_le();
            let reason = params.get_u8();
            HciEvent::DisconnectionComplete {
                status,
                handle,
                reason,
            }
        }
        EVT_AUTHENTICATION_COMPLETE => {
            if params.remaining() < 3 {
                return HciEvent::Unknown(code);
            }
            let status = params.get_u8();
            let handle = params.get_u16_le();
            HciEvent::AuthenticationComplete { status, handle }
        }
        EVT_REMOTE_NAME_REQUEST_COMPLETE => {
            if params.remaining() < 7 {
                return HciEvent::Unknown(code);
            }
            let status = params.get_u8();
            let bdaddr = read_bdaddr(&mut params);
            let name_bytes = params.to_vec();
            let name = String::from_utf8_lossy(&name_bytes)
                .trim_end_matches('\0')
                .to_string();
            HciEvent::RemoteNameRequestComplete {
                status,
                bdaddr,
                name,
            }
        }
        EVT_COMMAND_COMPLETE => {
            if params.remaining() < 4 {
                return HciEvent::Unknown(code);
            }
            params.advance(1); // num_hci_command_packets
            let opcode = Opcode::new(0, 0); // placeholder overwritten below
            let raw_opcode = params.get_u16_le();
            let opcode = decode_opcode(raw_opcode, opcode);
            let status = params.get_u8();
            HciEvent::CommandComplete {
                opcode,
                status,
                return_params: params,
            }
        }
        EVT_COMMAND_STATUS => {
            if params.remaining() < 4 {
                return HciEvent::Unknown(code);
            }
            let status = params.get_u8();
            params.advance(1); // num_hci_command_packets
            let raw_opcode = params.get_u16_le();
            HciEvent::CommandStatus {
                status,
                opcode: decode_opcode(raw_opcode, Opcode::new(0, 0)),
            }
        }
        EVT_LINK_KEY_REQUEST => {
            if params.remaining() < 6 {
                return HciEvent::Unknown(code);
            }
            HciEvent::LinkKeyRequest {
                bdaddr: read_bdaddr(&mut params),
            }
        }
        EVT_LINK_KEY_NOTIFY => {
            if params.remaining() < 23 {
                return HciEvent::Unknown(code);
            }
            let bdaddr = read_bdaddr(&mut params);
            let mut key = [0u8; 16];
            params.copy_to_slice(&mut key);
            HciEvent::LinkKeyNotify { bdaddr, key }
        }
        EVT_IO_CAPABILITY_REQUEST => {
            if params.remaining() < 6 {
                return HciEvent::Unknown(code);
            }
            HciEvent::IoCapabilityRequest {
                bdaddr: read_bdaddr(&mut params),
            }
        }
        EVT_IO_CAPABILITY_RESPONSE => {
            if params.remaining() < 6 {
                return HciEvent::Unknown(code);
            }
            HciEvent::IoCapabilityResponse {
                bdaddr: read_bdaddr(&mut params),
            }
        }
        EVT_USER_CONFIRMATION_REQUEST => {
            if params.remaining() < 6 {
                return HciEvent::Unknown(code);
            }
            HciEvent::UserConfirmationRequest {
                bdaddr: read_bdaddr(&mut params),
            }
        }
        EVT_SIMPLE_PAIRING_COMPLETE => {
            if params.remaining() < 7 {
                return HciEvent::Unknown(code);
            }
            let status = params.get_u8();
            let bdaddr = read_bdaddr(&mut params);
            HciEvent::SimplePairingComplete { status, bdaddr }
        }
        EVT_INQUIRY_COMPLETE => HciEvent::Unknown(code),
        other => HciEvent::Unknown(other),
    }
}

fn decode_opcode(raw: u16, _unused: Opcode) -> Opcode {
    Opcode::new((raw >> 10) as u8, raw & 0x03FF)
}

/// Item submitted to the TX ring: either a command to transmit, or the
/// `{0xFF, delay_ms}` sentinel consumed by [`CommandPump::run`] to delay
/// the next submission.
#[derive(Clone, Debug)]
pub enum TxItem {
    Command { opcode: Opcode, params: Bytes },
    Delay(Duration),
}

/// Single MPSC transmit ring serialising all outbound HCI commands,
/// gated by `CTRL_READY`.
#[derive(Debug, Clone)]
pub struct TxRing {
    tx: mpsc::Sender<TxItem>,
}

impl TxRing {
    pub fn new(capacity: usize, flags: Arc<AtomicFlags<ControllerFlag>>) -> (Self, CommandPump) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, CommandPump { rx, flags })
    }

    pub async fn submit(&self, opcode: Opcode, params: Bytes) -> Result<(), mpsc::error::SendError<TxItem>> {
        self.tx.send(TxItem::Command { opcode, params }).await
    }

    pub async fn submit_delay(&self, delay: Duration) -> Result<(), mpsc::error::SendError<TxItem>> {
        self.tx.send(TxItem::Delay(delay)).await
    }
}

/// Drains the TX ring, gating each command submission on a `CTRL_READY`
/// flag that flips on the controller "ready" callback, and honouring
/// queued delays before the next command is written.
pub struct CommandPump {
    rx: mpsc::Receiver<TxItem>,
    flags: Arc<AtomicFlags<ControllerFlag>>,
}

impl CommandPump {
    /// Runs until the TX ring is closed, writing each encoded H4 command
    /// frame via `write`.
    pub async fn run<W, Fut>(mut self, mut write: W)
    where
        W: FnMut(Bytes) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        while let Some(item) = self.rx.recv().await {
            match item {
                TxItem::Delay(d) => time::sleep(d).await,
                TxItem::Command { opcode, params } => {
                    self.flags.wait_until_set(ControllerFlag::Ready).await;
                    let frame = h4::encode_command(opcode, &params).freeze();
                    write(frame).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_code_is_dropped_not_errored() {
        assert_eq!(parse_event(0x99, Bytes::new()), HciEvent::Unknown(0x99));
    }

    #[test]
    fn connection_complete_parses_handle_and_bdaddr() {
        let mut params = vec![0x00, 0x10, 0x00];
        let mut addr = [1, 2, 3, 4, 5, 6];
        addr.reverse();
        params.extend_from_slice(&addr);
        params.push(0x01); // link_type
        params.push(0x00); // encryption_enabled
        let evt = parse_event(EVT_CONNECTION_COMPLETE, Bytes::from(params));
        assert_eq!(
            evt,
            HciEvent::ConnectionComplete {
                status: 0,
                handle: 0x0010,
                bdaddr: Address::new([1, 2, 3, 4, 5, 6]),
            }
        );
    }

    #[test]
    fn link_key_notify_parses_key() {
        let mut params = Vec::new();
        let mut addr = [1, 2, 3, 4, 5, 6];
        addr.reverse();
        params.extend_from_slice(&addr);
        let key = [0xAAu8; 16];
        params.extend_from_slice(&key);
        let evt = parse_event(EVT_LINK_KEY_NOTIFY, Bytes::from(params));
        assert_eq!(
            evt,
            HciEvent::LinkKeyNotify {
                bdaddr: Address::new([1, 2, 3, 4, 5, 6]),
                key,
            }
        );
    }

    #[tokio::test]
    async fn pump_gates_on_ctrl_ready() {
        let flags = Arc::new(AtomicFlags::<ControllerFlag>::new());
        let (ring, pump) = TxRing::new(4, flags.clone());
        let written = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let written_clone = written.clone();
        let handle = tokio::spawn(async move {
            pump.run(|frame: Bytes| {
                let written = written_clone.clone();
                async move {
                    written.lock().await.push(frame);
                }
            })
            .await;
        });
        ring.submit(Opcode::new(OGF_HOST_CTL, OCF_RESET), Bytes::new())
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert!(written.lock().await.is_empty());
        flags.set(ControllerFlag::Ready);
        tokio::time::timeout(Duration::from_secs(1), async {
            while written.lock().await.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        drop(ring);
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
