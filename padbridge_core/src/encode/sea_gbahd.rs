//! SEA board / GBAHD overlay encoding: the on-screen-display state machine
//! and config-word bit assignments (spec.md §4.8, supplemented from
//! `main/adapter/wired/sea.c`).
use super::{gated_btns, WiredData};
use crate::error::{EncodeError, EncodeResult};
use crate::mapping::TurboTable;
use crate::model::GenericCtrl;

/// Canonical bit used to enter/leave the on-screen menu (`PAD_MT`).
pub const PAD_MT_BIT: u32 = 18;
/// Canonical bit that persists the current menu selection (`PAD_MM`).
pub const PAD_MM_BIT: u32 = 20;
/// Canonical bit that cancels the menu (`PAD_RB_LEFT`).
pub const PAD_RB_LEFT_BIT: u32 = 21;

/// Directional nav bits (`UP|DOWN|LEFT|RIGHT`, bits 0..3) reported in
/// `buttons_osd` while the menu is active, matching the cardinal bit
/// assignment `decode::HAT_TO_BTNS` uses for the same physical bits.
const OSD_NAV_MASK: u32 = 0b1111;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OsdState {
    #[default]
    Idle,
    OsdActive,
}

/// `gbahd_config` bit assignments from `sea.c`: smoothing bit 0, grid bit
/// 1, colour bits 2..3, rate encoded separately.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GbahdConfig {
    pub smoothing: bool,
    pub grid: bool,
    pub colour: u8, // 2 bits, 0..3
    pub rate: u8,
}

impl GbahdConfig {
    pub fn to_word(self) -> u16 {
        (self.smoothing as u16) | ((self.grid as u16) << 1) | (((self.colour & 0x3) as u16) << 2)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SeaGbahdState {
    pub osd: OsdState,
    pub config: GbahdConfig,
    mt_held: bool,
}

impl SeaGbahdState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the `IDLE -> (hold PAD_MT, release) -> OSD_ACTIVE -> (nav)
    /// -> (PAD_MM to persist / PAD_RB_LEFT to cancel) -> IDLE` state
    /// machine (spec.md §4.8).
    pub fn observe_frame(&mut self, mt_pressed: bool, mm_pressed: bool, rb_left_pressed: bool) {
        match self.osd {
            OsdState::Idle => {
                if mt_pressed {
                    self.mt_held = true;
                } else if self.mt_held {
                    self.mt_held = false;
                    self.osd = OsdState::OsdActive;
                }
            }
            OsdState::OsdActive => {
                if mm_pressed || rb_left_pressed {
                    self.osd = OsdState::Idle;
                }
            }
        }
    }
}

pub struct SeaGbahdEncoder;

impl SeaGbahdEncoder {
    pub fn encode(
        &self,
        ctrl: &GenericCtrl,
        turbo: &TurboTable,
        wired: &mut WiredData,
        state: &mut SeaGbahdState,
    ) -> EncodeResult<()> {
        const LEN: usize = 4 + 4 + 2 + 2 + 2;
        if wired.output.len() < LEN {
            return Err(EncodeError::BufferTooSmall {
                need: LEN,
                got: wired.output.len(),
            });
        }
        let gated = gated_btns(ctrl, turbo, wired.frame_cnt);
        state.observe_frame(
            gated[0] & (1 << PAD_MT_BIT) != 0,
            gated[0] & (1 << PAD_MM_BIT) != 0,
            gated[0] & (1 << PAD_RB_LEFT_BIT) != 0,
        );
        wired.output[0..4].copy_from_slice(&gated[0].to_le_bytes());
        wired.output[4..8].copy_from_slice(&gated[1].to_le_bytes());
        // `buttons_osd` only carries nav input while the menu is open; it
        // is the idle digital frame's dedicated OSD navigation channel,
        // not a duplicate of `buttons`/`buttons_high`.
        let osd_buttons: u16 = if matches!(state.osd, OsdState::OsdActive) {
            (gated[0] & OSD_NAV_MASK) as u16
        } else {
            0
        };
        wired.output[8..10].copy_from_slice(&osd_buttons.to_le_bytes());
        let gbahd_state: u16 = matches!(state.osd, OsdState::OsdActive) as u16;
        wired.output[10..12].copy_from_slice(&gbahd_state.to_le_bytes());
        wired.output[12..14].copy_from_slice(&state.config.to_word().to_le_bytes());
        wired.tick();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_then_release_mt_enters_osd() {
        let mut state = SeaGbahdState::new();
        state.observe_frame(true, false, false);
        assert_eq!(state.osd, OsdState::Idle);
        state.observe_frame(false, false, false);
        assert_eq!(state.osd, OsdState::OsdActive);
    }

    #[test]
    fn persist_or_cancel_return_to_idle() {
        let mut state = SeaGbahdState::new();
        state.osd = OsdState::OsdActive;
        state.observe_frame(false, true, false);
        assert_eq!(state.osd, OsdState::Idle);

        let mut state2 = SeaGbahdState::new();
        state2.osd = OsdState::OsdActive;
        state2.observe_frame(false, false, true);
        assert_eq!(state2.osd, OsdState::Idle);
    }

    #[test]
    fn osd_buttons_carry_nav_bits_only_while_active() {
        let mut ctrl = GenericCtrl::new();
        ctrl.set_button(0, 0); // UP, one of the OSD_NAV_MASK bits
        let turbo = TurboTable::default();
        let mut wired = WiredData::new(14);
        let mut state = SeaGbahdState::new();

        // Idle: buttons_osd stays zero even though the nav bit is set.
        SeaGbahdEncoder.encode(&ctrl, &turbo, &mut wired, &mut state).unwrap();
        assert_eq!(u16::from_le_bytes([wired.output[8], wired.output[9]]), 0);

        state.osd = OsdState::OsdActive;
        SeaGbahdEncoder.encode(&ctrl, &turbo, &mut wired, &mut state).unwrap();
        assert_eq!(u16::from_le_bytes([wired.output[8], wired.output[9]]), 1);
    }

    #[test]
    fn config_word_bit_assignments() {
        let config = GbahdConfig {
            smoothing: true,
            grid: false,
            colour: 0b10,
            rate: 0,
        };
        assert_eq!(config.to_word(), 0b1001);
    }
}
