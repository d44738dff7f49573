//! Feedback path: wire drivers publish `raw_fb` frames, a per-console
//! routine normalises them into `generic_fb`, the host resolves
//! `wired_id -> bt_dev` and dispatches to the vendor HID profile's
//! `feedback` operation over the HID-interrupt channel.
use crate::device::DevicePool;
use crate::profile::hid_profile_for;

/// `raw_fb`: `{type, wired_id, payload}` as published by a wire driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawFb {
    pub fb_type: u8,
    pub wired_id: u8,
    pub payload: [u8; 2],
}

/// `generic_fb`: the console-independent feedback state produced by a
/// per-console `fb_to_generic` routine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GenericFb {
    pub wired_id: u8,
    pub state: u8,
    pub lf_pwr: u8,
    pub hf_pwr: u8,
    pub cycles: u8,
    pub start: bool,
    pub left_motor: u8,
    pub right_motor: u8,
}

/// N64's `raw_fb` payload is `{pak_write_ok:u8, rumble_ms_hi:u8}` scaled to
/// a flat power level on both motors (N64 has a single pak-rumble motor).
pub fn n64_fb_to_generic(raw: RawFb) -> GenericFb {
    GenericFb {
        wired_id: raw.wired_id,
        state: raw.payload[0],
        lf_pwr: raw.payload[1],
        hf_pwr: raw.payload[1],
        cycles: 0,
        start: raw.payload[0] != 0,
        left_motor: raw.payload[1],
        right_motor: raw.payload[1],
    }
}

/// ogx360's `raw_fb` payload is already `{left_motor, right_motor}`
/// (Duke-layout rumble), passed through unchanged.
pub fn ogx360_fb_to_generic(raw: RawFb) -> GenericFb {
    GenericFb {
        wired_id: raw.wired_id,
        left_motor: raw.payload[0],
        right_motor: raw.payload[1],
        ..Default::default()
    }
}

/// Resolves `wired_id -> bt_dev` by linear search across the device pool
/// and composes the outbound HID frame via the matching vendor feedback
/// handler. Returns `None` if no device currently owns that output port.
pub fn dispatch_feedback(pool: &mut DevicePool, fb: GenericFb) -> Option<Vec<u8>> {
    let dev = pool.find_by_output_port(fb.wired_id)?;
    let profile = hid_profile_for(dev.bt_type);
    Some(profile.feedback(dev, &fb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BtType;
    use padbridge_shared::Address;

    #[test]
    fn n64_feedback_uses_flat_motor_level() {
        let raw = RawFb {
            fb_type: 0,
            wired_id: 0,
            payload: [1, 200],
        };
        let fb = n64_fb_to_generic(raw);
        assert_eq!(fb.left_motor, 200);
        assert_eq!(fb.right_motor, 200);
        assert!(fb.start);
    }

    #[test]
    fn dispatch_misses_when_no_device_owns_the_port() {
        let mut pool = DevicePool::new();
        assert!(dispatch_feedback(&mut pool, GenericFb { wired_id: 3, ..Default::default() }).is_none());
    }

    #[test]
    fn dispatch_finds_device_bound_to_output_port() {
        let mut pool = DevicePool::new();
        let slot = pool.allocate(Address::new([1, 0, 0, 0, 0, 0]), BtType::Ps4).unwrap();
        pool.get_mut(slot).unwrap().output_port = Some(0);
        let out = dispatch_feedback(&mut pool, GenericFb { wired_id: 0, left_motor: 50, right_motor: 80, ..Default::default() });
        assert!(out.is_some());
    }
}
