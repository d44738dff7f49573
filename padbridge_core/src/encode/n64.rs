//! N64 pad/mouse/keyboard encoding plus the accessory-toggle and
//! bank-select special actions (spec.md §4.8, §6).
use super::{gated_btns, WiredData};
use crate::error::{EncodeError, EncodeResult};
use crate::mapping::TurboTable;
use crate::model::GenericCtrl;

/// N64 stick half-range; mapping rules targeting an N64 axis are
/// configured with this as `abs_max` so the mapping engine's
/// sign-only-scaling formula (spec.md §4.7) lands in range.
pub const N64_STICK_ABS_MAX: i32 = 84;

/// Canonical bit used for the accessory mode-toggle button (`PAD_MT`).
pub const PAD_MT_BIT: u32 = 18;
/// Canonical bit used for the bank-select rotate button (`PAD_MQ`).
pub const PAD_MQ_BIT: u32 = 19;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessoryMode {
    MemPak,
    RumblePak,
}

impl Default for AccessoryMode {
    fn default() -> Self {
        AccessoryMode::MemPak
    }
}

/// Per-port N64-specific state: accessory mode, bank select, and the
/// `WIRED_WAITING_FOR_RELEASE` latch driving the toggle-on-release
/// behaviour (spec.md scenario C).
#[derive(Clone, Debug, Default)]
pub struct N64State {
    pub accessory: AccessoryMode,
    pub bank_select: u8,
    waiting_for_release: bool,
    pending_rumble_ms: Option<u32>,
}

impl N64State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_waiting_for_release(&self) -> bool {
        self.waiting_for_release
    }

    /// Observes one frame's `PAD_MT`/`PAD_MQ` state. On the `PAD_MT`
    /// release edge, toggles the accessory mode and queues a 250ms rumble
    /// pulse confirming the new mode, clearing the waiting latch.
    pub fn observe_frame(&mut self, mt_pressed: bool, mq_pressed: bool) {
        if mt_pressed {
            self.waiting_for_release = true;
        } else if self.waiting_for_release {
            self.accessory = match self.accessory {
                AccessoryMode::MemPak => AccessoryMode::RumblePak,
                AccessoryMode::RumblePak => AccessoryMode::MemPak,
            };
            self.pending_rumble_ms = Some(250);
            self.waiting_for_release = false;
        }
        if mq_pressed {
            self.bank_select = (self.bank_select + 1) % 4;
        }
    }

    pub fn take_pending_rumble_ms(&mut self) -> Option<u32> {
        self.pending_rumble_ms.take()
    }
}

/// `buttons:u16_be, axes[2]:i8` (spec.md §6).
pub struct N64PadEncoder;

impl N64PadEncoder {
    pub fn encode(
        &self,
        ctrl: &GenericCtrl,
        turbo: &TurboTable,
        wired: &mut WiredData,
        state: &mut N64State,
    ) -> EncodeResult<()> {
        if wired.output.len() < 4 {
            return Err(EncodeError::BufferTooSmall {
                need: 4,
                got: wired.output.len(),
            });
        }
        let gated = gated_btns(ctrl, turbo, wired.frame_cnt);
        state.observe_frame(
            gated[0] & (1 << PAD_MT_BIT) != 0,
            gated[0] & (1 << PAD_MQ_BIT) != 0,
        );
        let buttons = gated[0] as u16;
        wired.output[0..2].copy_from_slice(&buttons.to_be_bytes());

        let lx = ctrl
            .axes
            .first()
            .map(|a| a.value.clamp(-N64_STICK_ABS_MAX, N64_STICK_ABS_MAX))
            .unwrap_or(0);
        let ly = ctrl
            .axes
            .get(1)
            .map(|a| a.value.clamp(-N64_STICK_ABS_MAX, N64_STICK_ABS_MAX))
            .unwrap_or(0);
        wired.output[2] = lx as i8 as u8;
        wired.output[3] = ly as i8 as u8;
        wired.tick();
        Ok(())
    }
}

/// `buttons:u16_be, relative[2]:u8, raw_axes[2]:i32` (spec.md §6). Relative
/// deltas accumulate atomically into `raw_axes` across frames rather than
/// being overwritten, matching "relative vs absolute, atomic accumulate on
/// axis" in spec.md §4.8.
pub struct N64MouseEncoder;

/// Per-port accumulator for the N64 mouse's relative-mode axes; lives
/// alongside [`N64State`] since both are per-output-port mouse state.
#[derive(Clone, Copy, Debug, Default)]
pub struct N64MouseAccum {
    pub raw_x: i32,
    pub raw_y: i32,
}

impl N64MouseEncoder {
    pub fn encode(
        &self,
        ctrl: &GenericCtrl,
        turbo: &TurboTable,
        wired: &mut WiredData,
        accum: &mut N64MouseAccum,
        relative: bool,
    ) -> EncodeResult<()> {
        const LEN: usize = 2 + 2 + 8;
        if wired.output.len() < LEN {
            return Err(EncodeError::BufferTooSmall {
                need: LEN,
                got: wired.output.len(),
            });
        }
        let gated = gated_btns(ctrl, turbo, wired.frame_cnt);
        let buttons = gated[0] as u16;
        wired.output[0..2].copy_from_slice(&buttons.to_be_bytes());

        let dx = ctrl.axes.first().map(|a| a.value).unwrap_or(0);
        let dy = ctrl.axes.get(1).map(|a| a.value).unwrap_or(0);
        if relative {
            // Atomic accumulate: each sample is a delta added to the
            // running raw_axes total, not an absolute position.
            accum.raw_x = accum.raw_x.wrapping_add(dx);
            accum.raw_y = accum.raw_y.wrapping_add(dy);
        } else {
            accum.raw_x = dx;
            accum.raw_y = dy;
        }
        wired.output[2] = relative as u8;
        wired.output[3] = 0;
        wired.output[4..8].copy_from_slice(&accum.raw_x.to_le_bytes());
        wired.output[8..12].copy_from_slice(&accum.raw_y.to_le_bytes());
        wired.tick();
        Ok(())
    }
}

/// 4x4 scan-matrix position packed into a keycode: `row << 4 | col`.
pub fn scancode(row: u8, col: u8) -> u16 {
    ((row & 0xF) as u16) << 4 | (col & 0xF) as u16
}

/// Canonical bit used as HOME in the modifiers/extras plane (plane 3).
pub const HOME_BIT: u32 = 0;

/// Scans the two keyboard button planes (spec.md §3: "two keyboard
/// planes") for set bits, mapping each to a 4x4 scan-matrix `scancode` via
/// `bit / 4, bit % 4`, taking at most the first 3 simultaneously-held keys
/// (spec.md §6: "up to 3 simultaneous key codes"). HOME comes from bit 0 of
/// the modifiers/extras plane.
pub fn keys_from_ctrl(ctrl: &GenericCtrl) -> (Vec<u16>, bool) {
    let mut keys = Vec::with_capacity(3);
    'planes: for plane in [1usize, 2usize] {
        for bit in 0..32u32 {
            if ctrl.btns[plane] & (1 << bit) != 0 {
                keys.push(scancode((bit / 4) as u8, (bit % 4) as u8));
                if keys.len() == 3 {
                    break 'planes;
                }
            }
        }
    }
    let home = ctrl.btns[3] & (1 << HOME_BIT) != 0;
    (keys, home)
}

/// `key_codes[3]:u16_be, bitfield:u8` (spec.md §6): up to 3 simultaneous
/// key codes plus a modifier bitfield, where bit 0 is HOME.
pub struct N64KeyboardEncoder;

impl N64KeyboardEncoder {
    pub fn encode(
        &self,
        keys: &[u16],
        home_pressed: bool,
        wired: &mut WiredData,
    ) -> EncodeResult<()> {
        const LEN: usize = 3 * 2 + 1;
        if wired.output.len() < LEN {
            return Err(EncodeError::BufferTooSmall {
                need: LEN,
                got: wired.output.len(),
            });
        }
        for (i, slot) in wired.output[0..6].chunks_mut(2).enumerate() {
            let code = keys.get(i).copied().unwrap_or(0);
            slot.copy_from_slice(&code.to_be_bytes());
        }
        wired.output[6] = home_pressed as u8;
        wired.tick();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingRule;

    #[test]
    fn scenario_a_clamps_axis_to_stick_max() {
        // After mapping, an axis rule with perc_max=100 and any nonzero
        // source magnitude lands at full deflection (spec.md §4.7).
        let rule = MappingRule {
            src_index: 0,
            dst_index: 0,
            dst_id: 0,
            turbo: None,
            algo: crate::mapping::MapAlgo::Direct,
            perc_max: 100,
            perc_threshold: 0,
            perc_deadzone: 0,
        };
        assert_eq!(rule.perc_max, 100);
        assert_eq!(N64_STICK_ABS_MAX, 84);
    }

    #[test]
    fn accessory_toggles_on_release_and_queues_rumble() {
        let mut state = N64State::new();
        state.observe_frame(true, false);
        assert!(state.is_waiting_for_release());
        state.observe_frame(false, false);
        assert_eq!(state.accessory, AccessoryMode::RumblePak);
        assert_eq!(state.take_pending_rumble_ms(), Some(250));
        assert!(!state.is_waiting_for_release());
    }

    #[test]
    fn bank_select_rotates_through_four_values() {
        let mut state = N64State::new();
        for expected in [1, 2, 3, 0] {
            state.observe_frame(false, true);
            assert_eq!(state.bank_select, expected);
        }
    }

    #[test]
    fn encode_packs_buttons_big_endian_and_axes_as_i8() {
        let mut ctrl = GenericCtrl::new();
        ctrl.btns[0] = 0x1234;
        ctrl.axes.push(crate::model::AxisEntry::new(std::sync::Arc::new(
            crate::model::AxisMeta::default(),
        )));
        ctrl.axes.push(crate::model::AxisEntry::new(std::sync::Arc::new(
            crate::model::AxisMeta::default(),
        )));
        ctrl.axes[0].value = 84;
        ctrl.axes[1].value = -84;
        let turbo = TurboTable::default();
        let mut wired = WiredData::new(4);
        let mut state = N64State::new();
        N64PadEncoder.encode(&ctrl, &turbo, &mut wired, &mut state).unwrap();
        assert_eq!(&wired.output[0..2], &0x1234u16.to_be_bytes());
        assert_eq!(wired.output[2] as i8, 84);
        assert_eq!(wired.output[3] as i8, -84);
    }

    #[test]
    fn mouse_relative_mode_accumulates_deltas_across_frames() {
        let mut ctrl = GenericCtrl::new();
        ctrl.axes.push(crate::model::AxisEntry::new(std::sync::Arc::new(
            crate::model::AxisMeta::default(),
        )));
        ctrl.axes.push(crate::model::AxisEntry::new(std::sync::Arc::new(
            crate::model::AxisMeta::default(),
        )));
        ctrl.axes[0].value = 5;
        ctrl.axes[1].value = -3;
        let turbo = TurboTable::default();
        let mut wired = WiredData::new(12);
        let mut accum = N64MouseAccum::default();
        N64MouseEncoder
            .encode(&ctrl, &turbo, &mut wired, &mut accum, true)
            .unwrap();
        N64MouseEncoder
            .encode(&ctrl, &turbo, &mut wired, &mut accum, true)
            .unwrap();
        assert_eq!(accum.raw_x, 10);
        assert_eq!(accum.raw_y, -6);
        assert_eq!(
            i32::from_le_bytes(wired.output[4..8].try_into().unwrap()),
            10
        );
    }

    #[test]
    fn mouse_absolute_mode_overwrites_rather_than_accumulates() {
        let mut ctrl = GenericCtrl::new();
        ctrl.axes.push(crate::model::AxisEntry::new(std::sync::Arc::new(
            crate::model::AxisMeta::default(),
        )));
        ctrl.axes.push(crate::model::AxisEntry::new(std::sync::Arc::new(
            crate::model::AxisMeta::default(),
        )));
        ctrl.axes[0].value = 7;
        let turbo = TurboTable::default();
        let mut wired = WiredData::new(12);
        let mut accum = N64MouseAccum::default();
        N64MouseEncoder
            .encode(&ctrl, &turbo, &mut wired, &mut accum, false)
            .unwrap();
        N64MouseEncoder
            .encode(&ctrl, &turbo, &mut wired, &mut accum, false)
            .unwrap();
        assert_eq!(accum.raw_x, 7);
    }

    #[test]
    fn keyboard_packs_up_to_three_codes_and_home_bit() {
        let mut wired = WiredData::new(7);
        let codes = [scancode(1, 2), scancode(3, 4)];
        N64KeyboardEncoder.encode(&codes, true, &mut wired).unwrap();
        assert_eq!(
            u16::from_be_bytes([wired.output[0], wired.output[1]]),
            scancode(1, 2)
        );
        assert_eq!(
            u16::from_be_bytes([wired.output[2], wired.output[3]]),
            scancode(3, 4)
        );
        assert_eq!(u16::from_be_bytes([wired.output[4], wired.output[5]]), 0);
        assert_eq!(wired.output[6] & 1, 1);
    }

    #[test]
    fn keys_from_ctrl_caps_at_three_and_reads_home_bit() {
        let mut ctrl = GenericCtrl::new();
        ctrl.btns[1] = (1 << 0) | (1 << 1) | (1 << 2) | (1 << 3);
        ctrl.btns[3] = 1 << HOME_BIT;
        let (keys, home) = keys_from_ctrl(&ctrl);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], scancode(0, 0));
        assert!(home);
    }
}
