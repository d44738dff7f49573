//! PS3 (Sixaxis/DualShock 3) decoding: `buttons:u32, reserved:u8,
//! axes[20]:u8` (spec.md §6). The last 16 axis slots are pressure-sensitive
//! face/shoulder buttons rather than sticks; axis 19 is `BTN_L`.
use super::{DecodeState, WirelessDecoder};
use crate::error::{DecodeError, DecodeResult};
use crate::model::{AxisEntry, AxisMeta, GenericCtrl};
use std::sync::Arc;

pub const AXIS_LX: usize = 0;
pub const AXIS_LY: usize = 1;
pub const AXIS_RX: usize = 2;
pub const AXIS_RY: usize = 3;
/// Analog `L2`/BTN_L trigger pressure, the axis exercised by scenario B.
pub const AXIS_BTN_L: usize = 19;

const STICK_AXES: usize = 4;
const PRESSURE_AXES: usize = 16;
const TOTAL_AXES: usize = STICK_AXES + PRESSURE_AXES;

pub struct Ps3Decoder;

impl WirelessDecoder for Ps3Decoder {
    fn decode(&self, state: &mut DecodeState, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        const HEADER: usize = 4 /* buttons */ + 1 /* reserved */;
        if report.len() < HEADER + TOTAL_AXES {
            return Err(DecodeError::ShortReport {
                need: HEADER + TOTAL_AXES,
                got: report.len(),
            });
        }
        state.ensure_initialized(|mapping| {
            mapping.mask[0] = u32::MAX;
            for bit in 0..32 {
                mapping.btns_mask[bit] = Some((0, bit as u8));
            }
            vec![]
        });
        ctrl.clear_cycle();
        ctrl.mask = state.mapping.mask;
        let native = u32::from_le_bytes([report[0], report[1], report[2], report[3]]);
        ctrl.btns[0] = native & ctrl.mask[0];

        if ctrl.axes.is_empty() {
            let stick_meta = Arc::new(AxisMeta {
                neutral: 0x80,
                abs_min: -0x80,
                abs_max: 0x7F,
                logical_min: 0,
                logical_max: 0xFF,
                ..Default::default()
            });
            let pressure_meta = Arc::new(AxisMeta {
                neutral: 0,
                abs_min: 0,
                abs_max: 0xFF,
                logical_min: 0,
                logical_max: 0xFF,
                ..Default::default()
            });
            for i in 0..STICK_AXES {
                ctrl.axes.push(AxisEntry::new(stick_meta.clone()));
                let _ = i;
            }
            for _ in 0..PRESSURE_AXES {
                ctrl.axes.push(AxisEntry::new(pressure_meta.clone()));
            }
            // This peer's analog data uses a 20-slot axes_cnt branch
            // (spec.md scenario B): mark bit 19's native slot as an axis
            // in the descriptor.
            ctrl.desc[1] |= 1 << (AXIS_BTN_L as u32 - 16);
        }
        let axes_raw = &report[HEADER..HEADER + TOTAL_AXES];
        for (i, entry) in ctrl.axes.iter_mut().enumerate().take(TOTAL_AXES) {
            let raw = axes_raw[i] as i32;
            entry.value = entry.meta.clamp(raw - entry.meta.neutral);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_btn_l_pressure_axis() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let mut report = vec![0u8; 4 + 1 + TOTAL_AXES];
        report[4 + 1 + AXIS_BTN_L] = 0xFF;
        Ps3Decoder.decode(&mut state, &report, &mut ctrl).unwrap();
        assert_eq!(ctrl.axes[AXIS_BTN_L].value, 0xFF);
        assert_ne!(ctrl.desc[1] & (1 << (AXIS_BTN_L as u32 - 16)), 0);
    }

    #[test]
    fn short_report_is_rejected() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let err = Ps3Decoder.decode(&mut state, &[0u8; 3], &mut ctrl).unwrap_err();
        assert!(matches!(err, DecodeError::ShortReport { .. }));
    }
}
