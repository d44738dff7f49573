//! Xbox Wireless Controller decoding. Byte layout normalised by the host's
//! HID profile handler to: `LX,LY:i16_le each, RX,RY:i16_le each,
//! LT,RT:u16_le each, hat:u8, btns:u16_le`.
use super::{DecodeState, WirelessDecoder, HAT_TO_BTNS};
use crate::error::{DecodeError, DecodeResult};
use crate::model::{AxisEntry, AxisMeta, GenericCtrl};
use std::sync::Arc;

pub const AXIS_LX: usize = 0;
pub const AXIS_LY: usize = 1;
pub const AXIS_RX: usize = 2;
pub const AXIS_RY: usize = 3;
pub const AXIS_LT: usize = 4;
pub const AXIS_RT: usize = 5;

pub struct XboxDecoder;

impl WirelessDecoder for XboxDecoder {
    fn decode(&self, state: &mut DecodeState, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        if report.len() < 15 {
            return Err(DecodeError::ShortReport {
                need: 15,
                got: report.len(),
            });
        }
        state.ensure_initialized(|mapping| {
            mapping.mask[0] = 0xFFFF | 0xF;
            vec![]
        });
        ctrl.clear_cycle();
        ctrl.mask = state.mapping.mask;

        let hat = report[12] as usize;
        ctrl.btns[0] |= HAT_TO_BTNS[hat.min(15)];
        let btns = u16::from_le_bytes([report[13], report[14]]) as u32;
        ctrl.btns[0] |= btns << 4;
        ctrl.btns[0] &= ctrl.mask[0];

        if ctrl.axes.is_empty() {
            let stick_meta = Arc::new(AxisMeta {
                neutral: 0,
                abs_min: i16::MIN as i32,
                abs_max: i16::MAX as i32,
                logical_min: i16::MIN as i32,
                logical_max: i16::MAX as i32,
                ..Default::default()
            });
            let trigger_meta = Arc::new(AxisMeta {
                neutral: 0,
                abs_min: 0,
                abs_max: u16::MAX as i32,
                logical_min: 0,
                logical_max: u16::MAX as i32,
                ..Default::default()
            });
            for _ in 0..4 {
                ctrl.axes.push(AxisEntry::new(stick_meta.clone()));
            }
            for _ in 0..2 {
                ctrl.axes.push(AxisEntry::new(trigger_meta.clone()));
            }
        }
        let read_i16 = |lo: u8, hi: u8| i16::from_le_bytes([lo, hi]) as i32;
        ctrl.axes[AXIS_LX].value = read_i16(report[0], report[1]);
        ctrl.axes[AXIS_LY].value = read_i16(report[2], report[3]);
        ctrl.axes[AXIS_RX].value = read_i16(report[4], report[5]);
        ctrl.axes[AXIS_RY].value = read_i16(report[6], report[7]);
        ctrl.axes[AXIS_LT].value = u16::from_le_bytes([report[8], report[9]]) as i32;
        ctrl.axes[AXIS_RT].value = u16::from_le_bytes([report[10], report[11]]) as i32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_trigger_axes() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let mut report = vec![0u8; 15];
        report[8] = 0xFF;
        report[9] = 0x00;
        report[12] = 8;
        XboxDecoder.decode(&mut state, &report, &mut ctrl).unwrap();
        assert_eq!(ctrl.axes[AXIS_LT].value, 0xFF);
    }
}
