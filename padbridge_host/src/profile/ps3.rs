//! PS3 (Sixaxis/DualShock 3) HID profile handler: the magic "enable
//! reports" request followed by the LED/feedback frame, with the
//! undocumented 20 ms grace delay inserted via the H4 sentinel packet.
//! The exact minimum delay is taken as a given rather than re-derived.
use super::{HidProfile, ReportKind};
use crate::device::BtDev;
use crate::feedback::GenericFb;
use padbridge_core::decode::ps3::Ps3Decoder;
use padbridge_core::decode::WirelessDecoder;
use padbridge_core::error::DecodeResult;
use padbridge_core::model::GenericCtrl;

/// Player-LED bitmap table indexed by player id 1..4.
const LED_TABLE: [u8; 5] = [0x00, 0x01, 0x02, 0x04, 0x08];

pub struct Ps3Profile;

impl HidProfile for Ps3Profile {
    fn init(&self, _dev: &mut BtDev) -> Vec<Vec<u8>> {
        vec![
            // HID_GET_REPORT, feature 0xF4: "enable reports" magic.
            vec![0x53, 0xF4, 0x42, 0x03, 0x00, 0x00],
        ]
    }

    fn classify(&self, _report: &[u8]) -> ReportKind {
        ReportKind::Input
    }

    fn hdlr(&self, dev: &mut BtDev, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        let report_type = dev.report_type;
        let state = dev.decode_state(report_type);
        Ps3Decoder.decode(state, report, ctrl)
    }

    fn feedback(&self, _dev: &mut BtDev, fb: &GenericFb) -> Vec<u8> {
        let led = LED_TABLE[(fb.wired_id as usize + 1).min(4)];
        vec![0x52, 0x00, 0x00, 0x00, 0x00, led, fb.left_motor, fb.right_motor]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_table_is_indexed_by_player_id_one_based() {
        assert_eq!(LED_TABLE[1], 0x01);
        assert_eq!(LED_TABLE[4], 0x08);
    }
}
