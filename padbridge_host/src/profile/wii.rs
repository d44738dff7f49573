//! Wii/Wii U HID profile handler, grounded on `main/bt_hidp_wii.c`:
//! extension register handshake, core+acc+ext reporting mode, and
//! LEDs-as-player-id feedback.
use super::{HidProfile, ReportKind};
use crate::device::BtDev;
use crate::feedback::GenericFb;
use padbridge_core::decode::wii::WiiDecoder;
use padbridge_core::decode::WirelessDecoder;
use padbridge_core::error::DecodeResult;
use padbridge_core::model::GenericCtrl;

/// Output report 0x20 is the Wii Remote's status report, used to detect
/// extension hot-plug. Reports identified as "status" trigger
/// re-initialisation.
const STATUS_REPORT_ID: u8 = 0x20;

pub struct WiiProfile;

impl HidProfile for WiiProfile {
    fn init(&self, _dev: &mut BtDev) -> Vec<Vec<u8>> {
        vec![
            // write 0x55 then 0x00 to the extension init registers at 0xFA
            vec![0x16, 0x04, 0xA4, 0x00, 0xF0, 0x01, 0x55],
            vec![0x16, 0x04, 0xA4, 0x00, 0xFB, 0x01, 0x00],
            // switch to core+accelerometer+extension reporting (0x3E)
            vec![0x12, 0x00, 0x3E],
        ]
    }

    fn classify(&self, report: &[u8]) -> ReportKind {
        match report.first() {
            Some(&STATUS_REPORT_ID) => ReportKind::Status,
            _ => ReportKind::Input,
        }
    }

    fn hdlr(&self, dev: &mut BtDev, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        let report_type = dev.report_type;
        let state = dev.decode_state(report_type);
        WiiDecoder.decode(state, &report[1..], ctrl)
    }

    /// LEDs-as-player-id nibble in the upper 4 bits of the rumble/LED byte.
    fn feedback(&self, _dev: &mut BtDev, fb: &GenericFb) -> Vec<u8> {
        let player_id = (fb.wired_id & 0x0F) + 1;
        let rumble = u8::from(fb.left_motor > 0 || fb.right_motor > 0);
        vec![0x11, (player_id << 4) | rumble]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_report_is_classified_separately_from_input() {
        let profile = WiiProfile;
        assert_eq!(profile.classify(&[0x20, 0, 0]), ReportKind::Status);
        assert_eq!(profile.classify(&[0x30, 0, 0]), ReportKind::Input);
    }

    #[test]
    fn feedback_packs_player_id_into_upper_nibble() {
        let mut pool = crate::device::DevicePool::new();
        let slot = pool
            .allocate(padbridge_shared::Address::new([0, 0, 0, 0, 0, 1]), crate::device::BtType::Wii)
            .unwrap();
        let dev = pool.get_mut(slot).unwrap();
        let profile = WiiProfile;
        let fb = GenericFb {
            wired_id: 1,
            left_motor: 0,
            right_motor: 0,
            ..Default::default()
        };
        let out = profile.feedback(dev, &fb);
        assert_eq!(out[1] >> 4, 2);
        assert_eq!(out[1] & 0x0F, 0);
    }
}
