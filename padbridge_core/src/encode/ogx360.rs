//! ogx360 (Xbox-to-original-Xbox adapter) encoding: a Duke-layout payload
//! plus rumble forwarded over an auxiliary I2C transport to per-port
//! co-processors, with absent-port marking on write failure (spec.md §7,
//! supplemented from `main/wired/ogx360_i2c.c`).
use super::{gated_btns, WiredData};
use crate::error::{EncodeError, EncodeResult};
use crate::mapping::TurboTable;
use crate::model::GenericCtrl;

const MAX_PORTS: usize = 7;

pub struct Ogx360Encoder;

impl Ogx360Encoder {
    /// `buttons:u16_le, triggers[2]:u8, axes[4]:i16_le` (Duke layout).
    pub fn encode(&self, ctrl: &GenericCtrl, turbo: &TurboTable, wired: &mut WiredData) -> EncodeResult<()> {
        const LEN: usize = 2 + 2 + 8;
        if wired.output.len() < LEN {
            return Err(EncodeError::BufferTooSmall {
                need: LEN,
                got: wired.output.len(),
            });
        }
        let gated = gated_btns(ctrl, turbo, wired.frame_cnt);
        wired.output[0..2].copy_from_slice(&(gated[0] as u16).to_le_bytes());
        for (i, axis) in ctrl.axes.iter().take(2).enumerate() {
            wired.output[2 + i] = axis.value.clamp(0, 0xFF) as u8;
        }
        for (i, axis) in ctrl.axes.iter().skip(2).take(4).enumerate() {
            let bytes = (axis.value as i16).to_le_bytes();
            wired.output[4 + i * 2..4 + i * 2 + 2].copy_from_slice(&bytes);
        }
        wired.tick();
        Ok(())
    }
}

/// Anything capable of writing a rumble command to one co-processor over
/// the auxiliary I2C bus. Implemented by the host's transport layer;
/// `padbridge_core` only defines the fanout/absent-marking policy.
pub trait AuxRumbleTransport {
    fn write(&mut self, port: usize, left_motor: u8, right_motor: u8) -> Result<(), ()>;
}

/// Forwards rumble to the per-port auxiliary co-processor, marking a port
/// absent after a write failure so subsequent frames skip it (spec.md §7:
/// "the affected output port is marked absent and skipped in subsequent
/// frames").
#[derive(Clone, Copy, Debug)]
pub struct Ogx360RumbleFanout {
    absent: [bool; MAX_PORTS],
}

impl Default for Ogx360RumbleFanout {
    fn default() -> Self {
        Self {
            absent: [false; MAX_PORTS],
        }
    }
}

impl Ogx360RumbleFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_absent(&self, port: usize) -> bool {
        self.absent.get(port).copied().unwrap_or(true)
    }

    pub fn send_rumble(
        &mut self,
        transport: &mut impl AuxRumbleTransport,
        port: usize,
        left_motor: u8,
        right_motor: u8,
    ) {
        if port >= MAX_PORTS || self.absent[port] {
            return;
        }
        if transport.write(port, left_motor, right_motor).is_err() {
            self.absent[port] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;
    impl AuxRumbleTransport for AlwaysFails {
        fn write(&mut self, _port: usize, _l: u8, _r: u8) -> Result<(), ()> {
            Err(())
        }
    }

    struct AlwaysSucceeds(std::cell::RefCell<Vec<(usize, u8, u8)>>);
    impl AuxRumbleTransport for AlwaysSucceeds {
        fn write(&mut self, port: usize, l: u8, r: u8) -> Result<(), ()> {
            self.0.borrow_mut().push((port, l, r));
            Ok(())
        }
    }

    #[test]
    fn write_failure_marks_port_absent_and_skips_future_frames() {
        let mut fanout = Ogx360RumbleFanout::new();
        let mut transport = AlwaysFails;
        assert!(!fanout.is_absent(2));
        fanout.send_rumble(&mut transport, 2, 255, 255);
        assert!(fanout.is_absent(2));
    }

    #[test]
    fn successful_write_is_forwarded() {
        let mut fanout = Ogx360RumbleFanout::new();
        let mut transport = AlwaysSucceeds(std::cell::RefCell::new(vec![]));
        fanout.send_rumble(&mut transport, 1, 10, 20);
        assert_eq!(transport.0.into_inner(), vec![(1, 10, 20)]);
    }
}
