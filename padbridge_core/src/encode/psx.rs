//! PSX/PS2 encoding, including the PS2 pressure-sensitive `axes_cnt = 20`
//! branch exercised by scenario B: when more than 4 axes are populated
//! (sticks plus per-button analog pressure), the encoder emits the
//! extended 20-axis frame instead of the plain digital one.
use super::{gated_btns, WiredData};
use crate::error::{EncodeError, EncodeResult};
use crate::mapping::TurboTable;
use crate::model::GenericCtrl;

const DIGITAL_AXES: usize = 2;
const PRESSURE_AXES: usize = 20;

pub struct PsxEncoder;

impl PsxEncoder {
    pub fn encode(&self, ctrl: &GenericCtrl, turbo: &TurboTable, wired: &mut WiredData) -> EncodeResult<()> {
        let pressure_sensitive = ctrl.axes.len() >= PRESSURE_AXES;
        let need = 4 + if pressure_sensitive { PRESSURE_AXES } else { DIGITAL_AXES };
        if wired.output.len() < need {
            return Err(EncodeError::BufferTooSmall {
                need,
                got: wired.output.len(),
            });
        }
        let gated = gated_btns(ctrl, turbo, wired.frame_cnt);
        wired.output[0..4].copy_from_slice(&gated[0].to_le_bytes());
        if pressure_sensitive {
            for (i, axis) in ctrl.axes.iter().take(PRESSURE_AXES).enumerate() {
                wired.output[4 + i] = axis.value.clamp(0, 0xFF) as u8;
            }
        } else {
            for (i, axis) in ctrl.axes.iter().take(DIGITAL_AXES).enumerate() {
                wired.output[4 + i] = axis.value.clamp(0, 0xFF) as u8;
            }
        }
        wired.tick();
        Ok(())
    }

    pub fn is_pressure_sensitive(&self, ctrl: &GenericCtrl) -> bool {
        ctrl.axes.len() >= PRESSURE_AXES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AxisEntry, AxisMeta};
    use std::sync::Arc;

    #[test]
    fn twenty_axes_selects_pressure_sensitive_branch() {
        let mut ctrl = GenericCtrl::new();
        let meta = Arc::new(AxisMeta::default());
        for _ in 0..20 {
            ctrl.axes.push(AxisEntry::new(meta.clone()));
        }
        ctrl.axes[19].value = 0xFF;
        let encoder = PsxEncoder;
        assert!(encoder.is_pressure_sensitive(&ctrl));
        let turbo = TurboTable::default();
        let mut wired = WiredData::new(24);
        encoder.encode(&ctrl, &turbo, &mut wired).unwrap();
        assert_eq!(wired.output[4 + 19], 0xFF);
    }
}
