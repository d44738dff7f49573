//! Nintendo Switch (Joy-Con/Pro Controller) decoding: standard report 0x30
//! byte layout, five selectable button-mask tables keyed by subtype
//! (spec.md §4.5 point 7).
use super::{apply_btns_mask, DecodeState, WirelessDecoder};
use crate::error::{DecodeError, DecodeResult};
use crate::model::{AxisEntry, AxisMeta, GenericCtrl};
use std::sync::Arc;

pub const AXIS_LX: usize = 0;
pub const AXIS_LY: usize = 1;
pub const AXIS_RX: usize = 2;
pub const AXIS_RY: usize = 3;

/// The within-vendor variant selector driving which button-mask table
/// applies. `Admiral` preserves the upstream table's dual mapping of one
/// physical bit to both `SW_LJC_L` and `SW_PRO_L`-shaped destinations;
/// spec.md's open questions explicitly say not to "fix" this.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchSubtype {
    ProControllerNative,
    ProControllerHid,
    JoyConL,
    JoyConR,
    Genesis,
    N64,
    Admiral,
    RfBrawler64,
}

const BTN_A: u8 = 0;
const BTN_B: u8 = 1;
const BTN_X: u8 = 2;
const BTN_Y: u8 = 3;
const BTN_L: u8 = 4;
const BTN_R: u8 = 5;
const BTN_ZL: u8 = 6;
const BTN_ZR: u8 = 7;
const BTN_MINUS: u8 = 8;
const BTN_PLUS: u8 = 9;
const BTN_HOME: u8 = 10;
const BTN_CAPTURE: u8 = 11;
const BTN_LSTICK: u8 = 12;
const BTN_RSTICK: u8 = 13;
const BTN_DU: u8 = 14;
const BTN_DD: u8 = 15;
const BTN_DL: u8 = 16;
const BTN_DR: u8 = 17;

type MaskTable = [Option<(u8, u8)>; 32];

fn pro_controller_native_table() -> MaskTable {
    let mut t: MaskTable = [None; 32];
    t[0] = Some((1, BTN_Y));
    t[1] = Some((1, BTN_X));
    t[2] = Some((1, BTN_B));
    t[3] = Some((1, BTN_A));
    t[6] = Some((1, BTN_R));
    t[7] = Some((1, BTN_ZR));
    t[8] = Some((1, BTN_MINUS));
    t[9] = Some((1, BTN_PLUS));
    t[10] = Some((1, BTN_RSTICK));
    t[11] = Some((1, BTN_LSTICK));
    t[12] = Some((1, BTN_HOME));
    t[13] = Some((1, BTN_CAPTURE));
    t[16] = Some((1, BTN_DD));
    t[17] = Some((1, BTN_DU));
    t[18] = Some((1, BTN_DR));
    t[19] = Some((1, BTN_DL));
    t[22] = Some((1, BTN_L));
    t[23] = Some((1, BTN_ZL));
    t
}

/// The Admiral-subtype table, preserved verbatim from the upstream source
/// including its inconsistency: bit 22 maps to the same destination slot
/// `BTN_L` that the plain Joy-Con(L) table also uses for a different
/// physical bit. See spec.md open questions.
fn admiral_table() -> MaskTable {
    let mut t = pro_controller_native_table();
    t[5] = Some((1, BTN_L));
    t
}

pub fn mask_table_for(subtype: SwitchSubtype) -> MaskTable {
    match subtype {
        SwitchSubtype::ProControllerNative
        | SwitchSubtype::ProControllerHid
        | SwitchSubtype::JoyConL
        | SwitchSubtype::JoyConR
        | SwitchSubtype::Genesis
        | SwitchSubtype::N64
        | SwitchSubtype::RfBrawler64 => pro_controller_native_table(),
        SwitchSubtype::Admiral => admiral_table(),
    }
}

/// Unpacks one 3-byte Switch stick field into a 12-bit raw value: `x = b0 |
/// ((b1 & 0xF) << 8)`, `y = (b1 >> 4) | (b2 << 4)`.
pub fn unpack_stick(bytes: [u8; 3]) -> (u16, u16) {
    let x = bytes[0] as u16 | (((bytes[1] & 0x0F) as u16) << 8);
    let y = (bytes[1] >> 4) as u16 | ((bytes[2] as u16) << 4);
    (x, y)
}

pub struct SwitchDecoder {
    pub subtype: SwitchSubtype,
}

impl WirelessDecoder for SwitchDecoder {
    fn decode(&self, state: &mut DecodeState, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        // report[0] = report id, [1..3) = timer/battery/conn, [3..6) = buttons
        // (3 bytes), [6..9) = left stick, [9..12) = right stick.
        if report.len() < 12 {
            return Err(DecodeError::ShortReport {
                need: 12,
                got: report.len(),
            });
        }
        if report[0] != 0x30 {
            return Err(DecodeError::UnknownReportId(report[0]));
        }
        let subtype = self.subtype;
        state.ensure_initialized(move |mapping| {
            mapping.btns_mask = mask_table_for(subtype);
            mapping.mask[1] = u32::MAX;
            vec![]
        });
        ctrl.clear_cycle();
        ctrl.mask = state.mapping.mask;
        let native = u32::from_le_bytes([report[3], report[4], report[5], 0]);
        apply_btns_mask(&state.mapping, native, ctrl);

        if ctrl.axes.is_empty() {
            let meta = Arc::new(AxisMeta {
                neutral: 0x800,
                abs_min: -0x7FF,
                abs_max: 0x7FF,
                logical_min: 0,
                logical_max: 0xFFF,
                ..Default::default()
            });
            for _ in 0..4 {
                ctrl.axes.push(AxisEntry::new(meta.clone()));
            }
        }
        let (lx, ly) = unpack_stick([report[6], report[7], report[8]]);
        let (rx, ry) = unpack_stick([report[9], report[10], report[11]]);
        for (i, raw) in [lx, ly, rx, ry].into_iter().enumerate() {
            let entry = &mut ctrl.axes[i];
            entry.value = entry.meta.clamp(raw as i32 - entry.meta.neutral);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_joycon_l_sticks_decode_to_zero() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let decoder = SwitchDecoder {
            subtype: SwitchSubtype::JoyConL,
        };
        let mut report = vec![0x30u8, 0, 0, 0, 0, 0];
        report.extend_from_slice(&[0x00, 0x08, 0x80, 0x00, 0x08, 0x80]);
        decoder.decode(&mut state, &report, &mut ctrl).unwrap();
        for axis in &ctrl.axes {
            assert_eq!(axis.value, 0);
        }
    }

    #[test]
    fn unpack_stick_centre_is_0x800() {
        assert_eq!(unpack_stick([0x00, 0x08, 0x80]), (0x800, 0x800));
    }

    #[test]
    fn unknown_report_id_is_rejected() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let decoder = SwitchDecoder {
            subtype: SwitchSubtype::ProControllerNative,
        };
        let report = vec![0x21u8; 12];
        let err = decoder.decode(&mut state, &report, &mut ctrl).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownReportId(0x21)));
    }
}
