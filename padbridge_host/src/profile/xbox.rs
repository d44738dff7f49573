//! Xbox Wireless Controller HID profile handler. The controller reports
//! unprompted once its HID-interrupt channel opens; this profile has no
//! init handshake of its own, only feedback (rumble).
use super::{HidProfile, ReportKind};
use crate::device::BtDev;
use crate::feedback::GenericFb;
use padbridge_core::decode::xbox::XboxDecoder;
use padbridge_core::decode::WirelessDecoder;
use padbridge_core::error::DecodeResult;
use padbridge_core::model::GenericCtrl;

pub struct XboxProfile;

impl HidProfile for XboxProfile {
    fn init(&self, _dev: &mut BtDev) -> Vec<Vec<u8>> {
        vec![]
    }

    fn classify(&self, _report: &[u8]) -> ReportKind {
        ReportKind::Input
    }

    fn hdlr(&self, dev: &mut BtDev, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        let report_type = dev.report_type;
        let state = dev.decode_state(report_type);
        XboxDecoder.decode(state, report, ctrl)
    }

    fn feedback(&self, _dev: &mut BtDev, fb: &GenericFb) -> Vec<u8> {
        vec![0x03, 0x0F, 0x00, fb.left_motor, fb.right_motor, 0xFF, 0x00, 0x00]
    }
}
