//! Nintendo Switch (Joy-Con/Pro Controller) HID profile handler, grounded
//! on `main/bt_hidp_sw.c`/`main/adapter/wireless/sw.c`: a fixed
//! subcommand sequence, each awaiting the rolling-transaction-id ack
//! before the next is issued.
use super::{HidProfile, ReportKind};
use crate::device::BtDev;
use crate::feedback::GenericFb;
use padbridge_core::decode::switch::{SwitchDecoder, SwitchSubtype};
use padbridge_core::decode::WirelessDecoder;
use padbridge_core::error::DecodeResult;
use padbridge_core::model::GenericCtrl;
use std::sync::atomic::{AtomicU8, Ordering};

/// Output report status byte identifying a subcommand ack: Switch
/// init/status reports share report id 0x21.
const SUBCOMMAND_ACK_REPORT_ID: u8 = 0x21;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchInitStage {
    SetInputReportMode,
    SetPlayerLights,
    EnableImu,
    EnableVibration,
    Done,
}

impl SwitchInitStage {
    fn subcommand(self) -> Option<(u8, Vec<u8>)> {
        match self {
            Self::SetInputReportMode => Some((0x03, vec![0x30])),
            Self::SetPlayerLights => Some((0x30, vec![0x01])),
            Self::EnableImu => Some((0x40, vec![0x01])),
            Self::EnableVibration => Some((0x48, vec![0x01])),
            Self::Done => None,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::SetInputReportMode => Self::SetPlayerLights,
            Self::SetPlayerLights => Self::EnableImu,
            Self::EnableImu => Self::EnableVibration,
            Self::EnableVibration => Self::Done,
            Self::Done => Self::Done,
        }
    }
}

/// One shared rolling transaction id across all subcommand writes.
#[derive(Debug, Default)]
pub struct RollingTransactionId(AtomicU8);

impl RollingTransactionId {
    pub fn next(&self) -> u8 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

#[derive(Default)]
pub struct SwitchProfile {
    transaction_id: RollingTransactionId,
}

impl SwitchProfile {
    fn frame(&self, subcommand: u8, args: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x01, self.transaction_id.next()];
        frame.extend_from_slice(&[0; 8]); // rumble bytes, neutral
        frame.push(subcommand);
        frame.extend_from_slice(args);
        frame
    }
}

impl HidProfile for SwitchProfile {
    fn init(&self, _dev: &mut BtDev) -> Vec<Vec<u8>> {
        let mut stage = SwitchInitStage::SetInputReportMode;
        let mut frames = Vec::new();
        while let Some((subcommand, args)) = stage.subcommand() {
            frames.push(self.frame(subcommand, &args));
            stage = stage.next();
        }
        frames
    }

    fn classify(&self, report: &[u8]) -> ReportKind {
        match report.first() {
            Some(&SUBCOMMAND_ACK_REPORT_ID) => ReportKind::Status,
            _ => ReportKind::Input,
        }
    }

    fn hdlr(&self, dev: &mut BtDev, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        let report_type = dev.report_type;
        let subtype = subtype_for(dev.bt_type, dev.report_id);
        let state = dev.decode_state(report_type);
        SwitchDecoder { subtype }.decode(state, report, ctrl)
    }

    /// Rumble prefix plus a rolling-transaction-id subcommand frame.
    fn feedback(&self, _dev: &mut BtDev, fb: &GenericFb) -> Vec<u8> {
        let mut frame = vec![0x10, self.transaction_id.next()];
        frame.extend_from_slice(&[fb.left_motor, fb.right_motor, fb.left_motor, fb.right_motor]);
        frame
    }
}

/// Subtype selection by vendor subtype and report id. `report_id` 0x01
/// is the native Joy-Con/Pro layout; anything else currently falls back
/// to the standard table.
fn subtype_for(bt_type: crate::device::BtType, report_id: u8) -> SwitchSubtype {
    match (bt_type, report_id) {
        (crate::device::BtType::SwitchV1, 0x01) => SwitchSubtype::ProControllerNative,
        (crate::device::BtType::SwitchV1, _) => SwitchSubtype::ProControllerHid,
        (crate::device::BtType::SwitchV2, _) => SwitchSubtype::JoyConL,
        _ => SwitchSubtype::ProControllerNative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_sequence_issues_all_four_subcommands_in_order() {
        let profile = SwitchProfile::default();
        let mut pool = crate::device::DevicePool::new();
        let slot = pool
            .allocate(padbridge_shared::Address::new([0, 0, 0, 0, 0, 3]), crate::device::BtType::SwitchV1)
            .unwrap();
        let dev = pool.get_mut(slot).unwrap();
        let frames = profile.init(dev);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0][10], 0x03);
        assert_eq!(frames[3][10], 0x48);
    }

    #[test]
    fn transaction_id_rolls_over_without_panicking() {
        let id = RollingTransactionId::default();
        for _ in 0..300u32 {
            id.next();
        }
    }
}
