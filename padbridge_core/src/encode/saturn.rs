//! Saturn (and similarly-shaped 3DO/etc.) encoding: a table-driven button
//! frame plus the shared turbo-mask machinery (spec.md §4.8).
use super::{gated_btns, WiredData};
use crate::error::{EncodeError, EncodeResult};
use crate::mapping::TurboTable;
use crate::model::GenericCtrl;

pub struct SaturnEncoder;

impl SaturnEncoder {
    /// `buttons:u16_le, axes[2]:u8` — digital pad plus the analog pad's two
    /// shoulder axes when present.
    pub fn encode(&self, ctrl: &GenericCtrl, turbo: &TurboTable, wired: &mut WiredData) -> EncodeResult<()> {
        if wired.output.len() < 4 {
            return Err(EncodeError::BufferTooSmall {
                need: 4,
                got: wired.output.len(),
            });
        }
        let gated = gated_btns(ctrl, turbo, wired.frame_cnt);
        wired.output[0..2].copy_from_slice(&(gated[0] as u16).to_le_bytes());
        for (i, axis) in ctrl.axes.iter().take(2).enumerate() {
            wired.output[2 + i] = axis.value.clamp(0, 0xFF) as u8;
        }
        wired.tick();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turbo_suppresses_bit_outside_its_window() {
        let mut ctrl = GenericCtrl::new();
        ctrl.set_button(0, 0);
        let rule = crate::mapping::MappingRule {
            src_index: 0,
            dst_index: 0,
            dst_id: 0,
            turbo: Some(4),
            algo: crate::mapping::MapAlgo::Direct,
            perc_max: 100,
            perc_threshold: 0,
            perc_deadzone: 0,
        };
        let turbo = TurboTable::from_rules(&[rule]).unwrap();
        let mut wired = WiredData::new(4);
        wired.frame_cnt = 5; // outside the first cnt_mask=4 frames of the 8-frame period
        SaturnEncoder.encode(&ctrl, &turbo, &mut wired).unwrap();
        assert_eq!(u16::from_le_bytes([wired.output[0], wired.output[1]]) & 1, 0);
    }
}
