//! Pure, synchronous controller pipeline: wireless-to-generic decoders,
//! the mapping engine, generic-to-wired encoders and the in-memory config
//! model. Nothing in this crate performs I/O; transport and host-side
//! orchestration live in `padbridge_transport`/`padbridge_host`.
pub mod bitreader;
pub mod calibration;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod mapping;
pub mod model;

pub use decode::WirelessDecoder;
pub use model::GenericCtrl;
