//! HID profile handlers: one per vendor family, each supplying
//! `init`/`hdlr`/`feedback` to the host. Modelled as a closed sum type
//! over [`crate::device::BtType`], dispatched from a selector function
//! rather than a table of function pointers.
mod hid;
mod ps3;
mod ps4;
mod switch;
mod wii;
mod xbox;

use crate::device::{BtDev, BtType};
use crate::feedback::GenericFb;
use padbridge_core::error::DecodeResult;
use padbridge_core::model::GenericCtrl;

/// Whether an inbound HID report is a status report (triggers
/// re-initialisation, e.g. Wii extension hot-plug) or an input report
/// (forwarded to the wireless decoder).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportKind {
    Status,
    Input,
}

/// The operations a vendor HID profile handler supplies to the host.
pub trait HidProfile {
    /// Handshake bytes to write on the HID control channel to place the
    /// peer into its data-reporting mode. Returned as a sequence since
    /// several vendors (Switch, Wii) require more than one write.
    fn init(&self, dev: &mut BtDev) -> Vec<Vec<u8>>;

    fn classify(&self, report: &[u8]) -> ReportKind;

    /// Dispatches one inbound report. Status reports drive the handler's
    /// own state (e.g. Wii extension hot-plug); input reports are handed
    /// to the wireless-to-generic decoder.
    fn hdlr(&self, dev: &mut BtDev, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()>;

    /// Composes the outbound HID-interrupt frame carrying rumble/LED state
    /// in the vendor's layout.
    fn feedback(&self, dev: &mut BtDev, fb: &GenericFb) -> Vec<u8>;
}

/// Selects the profile handler for a vendor type: one handler per vendor
/// family.
pub fn hid_profile_for(bt_type: BtType) -> Box<dyn HidProfile> {
    match bt_type {
        BtType::Wii | BtType::WiiU => Box::new(wii::WiiProfile),
        BtType::Ps3 => Box::new(ps3::Ps3Profile),
        BtType::Ps4 | BtType::Ps5 => Box::new(ps4::Ps4Profile),
        BtType::SwitchV1 | BtType::SwitchV2 => Box::new(switch::SwitchProfile::default()),
        BtType::Xbox => Box::new(xbox::XboxProfile),
        BtType::GenericHid => Box::new(hid::HidGenericProfile),
    }
}
