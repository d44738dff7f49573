//! Generic HID profile handler: the fallback for any peer that doesn't
//! match a known vendor prefix. The report-field table is built once from
//! the peer's HID report descriptor and cached for the life of the
//! connection.
use super::{HidProfile, ReportKind};
use crate::device::BtDev;
use crate::feedback::GenericFb;
use padbridge_core::decode::hid_generic::HidGenericDecoder;
use padbridge_core::decode::WirelessDecoder;
use padbridge_core::error::DecodeResult;
use padbridge_core::model::GenericCtrl;

pub struct HidGenericProfile;

impl HidProfile for HidGenericProfile {
    fn init(&self, _dev: &mut BtDev) -> Vec<Vec<u8>> {
        vec![]
    }

    fn classify(&self, _report: &[u8]) -> ReportKind {
        ReportKind::Input
    }

    /// Decoding a peer with an as-yet unparsed descriptor produces an
    /// empty field table, which yields an all-zero sample rather than an
    /// error; descriptor parsing is an external collaborator's job.
    fn hdlr(&self, dev: &mut BtDev, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        let report_meta = dev
            .hid_report_meta
            .clone()
            .unwrap_or_default();
        let report_type = dev.report_type;
        let state = dev.decode_state(report_type);
        HidGenericDecoder { report_meta }.decode(state, report, ctrl)
    }

    fn feedback(&self, _dev: &mut BtDev, _fb: &GenericFb) -> Vec<u8> {
        // Generic HID peers have no standardised rumble/LED output report;
        // silently drop the feedback.
        vec![]
    }
}

