//! HCI/L2CAP transport layer: H4 framing, raw Bluetooth sockets, L2CAP
//! signalling, and the minimal SDP/ATT responders.
//!
//! `sock` is the wire-driver facade onto the actual HCI controller: a thin,
//! mostly-unmodified carry-over of raw `AF_BLUETOOTH` socket plumbing,
//! treating the physical transport as an external collaborator.
//! Everything above it (`h4`, `hci`, `l2cap_sig`, `sdp`, `att`) is new,
//! built against that socket layer.
pub use padbridge_shared::Address;

pub mod att;
pub mod h4;
pub mod hci;
pub mod l2cap_sig;
pub mod sdp;
pub mod sock;
