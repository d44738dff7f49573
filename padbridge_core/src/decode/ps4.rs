//! PS4 (DualShock 4) / PS5 (DualSense) decoding. The host's HID profile
//! handler strips the vendor report-id/timestamp prelude before handing
//! the core a normalised byte slice: `LX, LY, RX, RY, hat_and_btns_lo,
//! btns_mid, btns_hi, l2_analog, r2_analog`.
use super::{DecodeState, WirelessDecoder, HAT_TO_BTNS};
use crate::error::{DecodeError, DecodeResult};
use crate::model::{AxisEntry, AxisMeta, GenericCtrl};
use std::sync::Arc;

pub const AXIS_LX: usize = 0;
pub const AXIS_LY: usize = 1;
pub const AXIS_RX: usize = 2;
pub const AXIS_RY: usize = 3;
pub const AXIS_L2: usize = 4;
pub const AXIS_R2: usize = 5;

const SQUARE: u32 = 1 << 4;
const CROSS: u32 = 1 << 5;
const CIRCLE: u32 = 1 << 6;
const TRIANGLE: u32 = 1 << 7;
const L1: u32 = 1 << 8;
const R1: u32 = 1 << 9;
const L2_DIGITAL: u32 = 1 << 10;
const R2_DIGITAL: u32 = 1 << 11;
const SHARE: u32 = 1 << 12;
const OPTIONS: u32 = 1 << 13;
const L3: u32 = 1 << 14;
const R3: u32 = 1 << 15;
const PS: u32 = 1 << 16;
const TOUCHPAD: u32 = 1 << 17;

pub struct Ps4Decoder;

impl WirelessDecoder for Ps4Decoder {
    fn decode(&self, state: &mut DecodeState, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        if report.len() < 9 {
            return Err(DecodeError::ShortReport {
                need: 9,
                got: report.len(),
            });
        }
        state.ensure_initialized(|mapping| {
            mapping.mask[0] = SQUARE
                | CROSS
                | CIRCLE
                | TRIANGLE
                | L1
                | R1
                | L2_DIGITAL
                | R2_DIGITAL
                | SHARE
                | OPTIONS
                | L3
                | R3
                | PS
                | TOUCHPAD
                | 0xF; // hat-derived d-pad bits
            vec![]
        });
        ctrl.clear_cycle();
        ctrl.mask = state.mapping.mask;

        let hat = (report[4] & 0x0F) as usize;
        ctrl.btns[0] |= HAT_TO_BTNS[hat.min(15)];

        let btns_mid = (report[4] >> 4) as u32;
        let btns_hi = report[5] as u32;
        let btns_hi2 = report[6] as u32;
        // bit layout: square,cross,circle,triangle in btns_mid low nibble
        ctrl.btns[0] |= (btns_mid & 0x1) << 4; // square
        ctrl.btns[0] |= ((btns_mid >> 1) & 0x1) << 5; // cross
        ctrl.btns[0] |= ((btns_mid >> 2) & 0x1) << 6; // circle
        ctrl.btns[0] |= ((btns_mid >> 3) & 0x1) << 7; // triangle
        ctrl.btns[0] |= (btns_hi & 0x1) << 8; // l1
        ctrl.btns[0] |= ((btns_hi >> 1) & 0x1) << 9; // r1
        ctrl.btns[0] |= ((btns_hi >> 2) & 0x1) << 10; // l2 digital
        ctrl.btns[0] |= ((btns_hi >> 3) & 0x1) << 11; // r2 digital
        ctrl.btns[0] |= ((btns_hi >> 4) & 0x1) << 12; // share
        ctrl.btns[0] |= ((btns_hi >> 5) & 0x1) << 13; // options
        ctrl.btns[0] |= ((btns_hi >> 6) & 0x1) << 14; // l3
        ctrl.btns[0] |= ((btns_hi >> 7) & 0x1) << 15; // r3
        ctrl.btns[0] |= (btns_hi2 & 0x1) << 16; // ps
        ctrl.btns[0] |= ((btns_hi2 >> 1) & 0x1) << 17; // touchpad
        ctrl.btns[0] &= ctrl.mask[0];

        if ctrl.axes.is_empty() {
            let stick_meta = Arc::new(AxisMeta {
                neutral: 0x80,
                abs_min: -0x80,
                abs_max: 0x7F,
                logical_min: 0,
                logical_max: 0xFF,
                ..Default::default()
            });
            let trigger_meta = Arc::new(AxisMeta {
                neutral: 0,
                abs_min: 0,
                abs_max: 0xFF,
                logical_min: 0,
                logical_max: 0xFF,
                ..Default::default()
            });
            for _ in 0..4 {
                ctrl.axes.push(AxisEntry::new(stick_meta.clone()));
            }
            for _ in 0..2 {
                ctrl.axes.push(AxisEntry::new(trigger_meta.clone()));
            }
        }
        for (i, &raw) in [report[0], report[1], report[2], report[3]].iter().enumerate() {
            let entry = &mut ctrl.axes[i];
            entry.value = entry.meta.clamp(raw as i32 - entry.meta.neutral);
        }
        ctrl.axes[AXIS_L2].value = report[7] as i32;
        ctrl.axes[AXIS_R2].value = report[8] as i32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_centred_sticks_to_zero() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let report = [0x80, 0x80, 0x80, 0x80, 0x08 /* hat neutral */, 0, 0, 0, 0];
        Ps4Decoder.decode(&mut state, &report, &mut ctrl).unwrap();
        assert_eq!(ctrl.axes[AXIS_LX].value, 0);
        assert_eq!(ctrl.btns[0] & 0xF, 0);
    }

    #[test]
    fn decodes_cross_button() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let report = [0x80, 0x80, 0x80, 0x80, 0x08 | (0b0010 << 4), 0, 0, 0, 0];
        Ps4Decoder.decode(&mut state, &report, &mut ctrl).unwrap();
        assert_eq!(ctrl.btns[0] & CROSS, CROSS);
    }
}
