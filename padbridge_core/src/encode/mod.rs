//! Generic-to-wired encoders (spec.md §4.8): one per console family,
//! translating [`crate::model::GenericCtrl`] into the console's native
//! wire frame, gated by the turbo mask.
use crate::mapping::TurboTable;
use crate::model::GenericCtrl;

pub mod n64;
pub mod ogx360;
pub mod psx;
pub mod saturn;
pub mod sea_gbahd;

/// `wired_data` (spec.md §3): the opaque output buffer, the turbo AND-mask,
/// and the per-port frame counter that drives turbo cadence.
#[derive(Clone, Debug, Default)]
pub struct WiredData {
    pub output: Vec<u8>,
    pub output_mask: Vec<u8>,
    pub frame_cnt: u32,
}

impl WiredData {
    pub fn new(len: usize) -> Self {
        Self {
            output: vec![0; len],
            output_mask: vec![0xFF; len],
            frame_cnt: 0,
        }
    }

    /// Advances the frame counter exactly once per transmission, per
    /// spec.md §5's ordering guarantee.
    pub fn tick(&mut self) {
        self.frame_cnt = self.frame_cnt.wrapping_add(1);
    }
}

/// Whether a turbo-enabled bit should currently assert: `frame_cnt %
/// (2*cnt_mask) < cnt_mask`, i.e. the first half of each `2*cnt_mask`-frame
/// period (50% duty), matching property 5 and scenario D (`cnt_mask=4` ->
/// asserted on 4 of every 8 frames).
pub fn turbo_asserted(frame_cnt: u32, cnt_mask: u8) -> bool {
    if cnt_mask == 0 {
        return true;
    }
    let period = 2 * cnt_mask as u32;
    frame_cnt % period < cnt_mask as u32
}

/// Computes the turbo AND-mask for one button plane at the current frame:
/// bits without a turbo entry pass straight through; bits with one are
/// gated by [`turbo_asserted`].
pub fn turbo_gate(turbo: &TurboTable, plane: usize, frame_cnt: u32) -> u32 {
    let mut mask = u32::MAX;
    for bit in 0..32u32 {
        if let Some(cnt_mask) = turbo.cadence_for(plane, bit) {
            if !turbo_asserted(frame_cnt, cnt_mask) {
                mask &= !(1 << bit);
            }
        }
    }
    mask
}

/// Applies the turbo gate to `ctrl`'s button planes in place, yielding the
/// bits the encoder should actually write this frame.
pub fn gated_btns(ctrl: &GenericCtrl, turbo: &TurboTable, frame_cnt: u32) -> [u32; crate::model::NUM_BTN_PLANES] {
    let mut out = ctrl.btns;
    for (plane, bits) in out.iter_mut().enumerate() {
        *bits &= turbo_gate(turbo, plane, frame_cnt);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turbo_asserted_matches_scenario_d() {
        let on_count = (0..8).filter(|&f| turbo_asserted(f, 4)).count();
        assert_eq!(on_count, 4);
    }

    #[test]
    fn zero_cadence_always_asserts() {
        assert!(turbo_asserted(123, 0));
    }
}
