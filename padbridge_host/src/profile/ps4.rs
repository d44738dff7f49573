//! PS4 (DualShock 4) / PS5 (DualSense) HID profile handler, grounded on
//! `main/bt_hidp_ps4.c`/`main/ps4.c`: output reports carry a trailing
//! CRC-32 (poly 0xEDB88320) over the whole frame prefixed by the HID
//! report-type byte 0xA2.
use super::{HidProfile, ReportKind};
use crate::device::BtDev;
use crate::feedback::GenericFb;
use padbridge_core::decode::ps4::Ps4Decoder;
use padbridge_core::decode::WirelessDecoder;
use padbridge_core::error::DecodeResult;
use padbridge_core::model::GenericCtrl;

const HID_OUTPUT_REPORT_TYPE: u8 = 0xA2;

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= b as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

/// Appends the CRC-32 footer over `{0xA2} ++ frame`.
fn with_crc_footer(mut frame: Vec<u8>) -> Vec<u8> {
    let mut crc_input = vec![HID_OUTPUT_REPORT_TYPE];
    crc_input.extend_from_slice(&frame);
    let crc = crc32(&crc_input);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

pub struct Ps4Profile;

impl HidProfile for Ps4Profile {
    fn init(&self, _dev: &mut BtDev) -> Vec<Vec<u8>> {
        vec![with_crc_footer(vec![0x11, 0xC0, 0x20, 0x07, 0x00, 0x00, 0x00, 0x00])]
    }

    fn classify(&self, _report: &[u8]) -> ReportKind {
        ReportKind::Input
    }

    fn hdlr(&self, dev: &mut BtDev, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        let report_type = dev.report_type;
        let state = dev.decode_state(report_type);
        Ps4Decoder.decode(state, report, ctrl)
    }

    /// RGB LED triplet and rumble, CRC-protected.
    fn feedback(&self, _dev: &mut BtDev, fb: &GenericFb) -> Vec<u8> {
        let (r, g, b) = player_rgb(fb.wired_id);
        with_crc_footer(vec![0x11, 0xC0, 0x20, 0x07, fb.right_motor, fb.left_motor, r, g, b])
    }
}

/// A fixed player-id to RGB mapping (DualShock 4's light bar has no
/// "player LED" concept, so the console's player index is rendered as
/// colour instead).
fn player_rgb(wired_id: u8) -> (u8, u8, u8) {
    const COLOURS: [(u8, u8, u8); 4] = [(0, 0, 255), (255, 0, 0), (0, 255, 0), (255, 255, 0)];
    COLOURS[(wired_id as usize).min(3)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_of_known_vector_matches_reference() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn feedback_frame_carries_a_four_byte_crc_footer() {
        let profile = Ps4Profile;
        let mut pool = crate::device::DevicePool::new();
        let slot = pool
            .allocate(padbridge_shared::Address::new([0, 0, 0, 0, 0, 2]), crate::device::BtType::Ps4)
            .unwrap();
        let dev = pool.get_mut(slot).unwrap();
        let fb = GenericFb {
            wired_id: 0,
            left_motor: 10,
            right_motor: 20,
            ..Default::default()
        };
        let out = profile.feedback(dev, &fb);
        assert_eq!(out.len(), 9 + 4);
        let body_with_prefix: Vec<u8> = std::iter::once(HID_OUTPUT_REPORT_TYPE).chain(out[..9].iter().copied()).collect();
        assert_eq!(crc32(&body_with_prefix).to_le_bytes(), out[9..]);
    }
}
