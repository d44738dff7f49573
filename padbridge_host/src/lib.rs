//! The Bluetooth host orchestrator: the seven-slot device pool, the
//! 16-slot link-key store, per-vendor HID profile handlers, the feedback
//! path, and the wire-driver facade. Built on `padbridge_transport`'s
//! HCI/L2CAP/SDP/ATT layer and `padbridge_core`'s decoders/mapping
//! engine/encoders.
pub mod device;
pub mod feedback;
pub mod linkkey;
pub mod orchestrator;
pub mod profile;
pub mod wire_facade;

pub use device::{BtDev, BtType, DevicePool};
pub use padbridge_transport::Address;
