//! Wii/Wii U decoding, including the extension identification/subtype
//! downgrade state machine (spec.md §4.5 point 6, supplemented from
//! `main/adapter/wireless/wii.c`).
use super::{apply_btns_mask, DecodeState, WirelessDecoder};
use crate::error::{DecodeError, DecodeResult};
use crate::model::GenericCtrl;

/// Within-vendor variant selector for the Wii extension port.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WiiExtSubtype {
    #[default]
    None,
    Nunchuck,
    Classic,
    ClassicPro,
    WiiUPro,
    /// The degenerate 8-bit-classic encoding some third-party extensions
    /// report; an all-zero payload under this subtype forces a downgrade.
    EightBitClassic,
}

/// Identifies the extension from the 6-byte read at register `0xFA`
/// (spec.md §4.5 point 6). Unknown ids fall back to `None` (no extension).
pub fn identify_extension(id_bytes: &[u8; 6]) -> WiiExtSubtype {
    match id_bytes {
        [0x00, 0x00, 0xA4, 0x20, 0x00, 0x00] => WiiExtSubtype::Nunchuck,
        [0x00, 0x00, 0xA4, 0x20, 0x01, 0x01] => WiiExtSubtype::Classic,
        [0x01, 0x00, 0xA4, 0x20, 0x01, 0x01] => WiiExtSubtype::ClassicPro,
        [0x00, 0x00, 0xA4, 0x20, 0x01, 0x20] => WiiExtSubtype::WiiUPro,
        [0x00, 0x00, 0xA4, 0x20, 0x01, 0x00] => WiiExtSubtype::EightBitClassic,
        _ => WiiExtSubtype::None,
    }
}

/// State machine driving the extension identification read and the
/// downgrade-on-all-zero-payload rule (spec.md §4.5 point 6).
#[derive(Clone, Copy, Debug, Default)]
pub struct WiiExtProbe {
    pub subtype: WiiExtSubtype,
    probed: bool,
}

impl WiiExtProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_identification_read(&mut self, id_bytes: &[u8; 6]) {
        self.subtype = identify_extension(id_bytes);
        self.probed = true;
    }

    pub fn is_probed(&self) -> bool {
        self.probed
    }

    /// Observes one extension payload; returns `true` if the payload is
    /// all-zero under the 8-bit-classic subtype, which the host must react
    /// to by issuing a subtype downgrade and restarting decode (no sample
    /// produced this frame, per spec.md "Failure modes").
    pub fn observes_zero_payload_downgrade(&self, ext_payload: &[u8]) -> bool {
        self.subtype == WiiExtSubtype::EightBitClassic && ext_payload.iter().all(|&b| b == 0)
    }
}

/// Core Wii Remote button bitmap (2 bytes, bits packed per the HID report).
const WII_CORE_BTN_MASK: [u32; 16] = [
    0, 0, 1 << 0, 1 << 1, 1 << 2, 1 << 3, 0, 0, 1 << 4, 1 << 5, 1 << 6, 1 << 7, 0, 0, 1 << 8, 1 << 9,
];

pub struct WiiDecoder;

impl WirelessDecoder for WiiDecoder {
    fn decode(&self, state: &mut DecodeState, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        if report.len() < 2 {
            return Err(DecodeError::ShortReport {
                need: 2,
                got: report.len(),
            });
        }
        state.ensure_initialized(|mapping| {
            mapping.mask[0] = 0x03FF;
            mapping.desc[0] = 0;
            for bit in 0..16 {
                if WII_CORE_BTN_MASK[bit] != 0 {
                    let dst_bit = WII_CORE_BTN_MASK[bit].trailing_zeros() as u8;
                    mapping.btns_mask[bit] = Some((0, dst_bit));
                }
            }
            vec![]
        });
        ctrl.clear_cycle();
        ctrl.mask = state.mapping.mask;
        ctrl.desc = state.mapping.desc;
        let native = u16::from_le_bytes([report[0], report[1]]) as u32;
        apply_btns_mask(&state.mapping, native, ctrl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_nunchuck() {
        let id = [0x00, 0x00, 0xA4, 0x20, 0x00, 0x00];
        assert_eq!(identify_extension(&id), WiiExtSubtype::Nunchuck);
    }

    #[test]
    fn reissuing_identification_read_is_idempotent() {
        let mut probe = WiiExtProbe::new();
        let id = [0x00, 0x00, 0xA4, 0x20, 0x01, 0x01];
        probe.on_identification_read(&id);
        let first = probe.subtype;
        probe.on_identification_read(&id);
        assert_eq!(probe.subtype, first);
        assert_eq!(first, WiiExtSubtype::Classic);
    }

    #[test]
    fn all_zero_payload_under_eight_bit_classic_triggers_downgrade() {
        let mut probe = WiiExtProbe::new();
        probe.on_identification_read(&[0x00, 0x00, 0xA4, 0x20, 0x01, 0x00]);
        assert!(probe.observes_zero_payload_downgrade(&[0, 0, 0, 0, 0, 0]));
        assert!(!probe.observes_zero_payload_downgrade(&[0, 0, 1, 0, 0, 0]));
    }

    #[test]
    fn decode_applies_core_button_mask() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        // bit 2 set -> canonical bit 0
        let report = [0b0000_0100, 0b0000_0000];
        WiiDecoder.decode(&mut state, &report, &mut ctrl).unwrap();
        assert!(ctrl.button(0, 0));
    }
}
