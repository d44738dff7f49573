//! Generic HID decoding: fields are sliced by a `hid_report_meta` computed
//! once from the peer's HID report descriptor, rather than by a fixed
//! per-vendor offset table. Descriptor parsing itself lives in the host's
//! HID profile handler; this module only consumes the resulting field
//! table.
use super::{DecodeState, WirelessDecoder};
use crate::bitreader::BitReader;
use crate::error::{DecodeError, DecodeResult};
use crate::model::{AxisEntry, AxisMeta, GenericCtrl};
use std::sync::Arc;

/// One declared field from the peer's HID report descriptor.
#[derive(Clone, Copy, Debug)]
pub struct HidField {
    pub bit_offset: usize,
    pub bit_width: usize,
    pub logical_min: i32,
    pub logical_max: i32,
    pub is_axis: bool,
}

/// The cached per-peer field table (`hid_report_meta`), built once and
/// reused across reports until disconnection.
#[derive(Clone, Debug, Default)]
pub struct HidReportMeta {
    /// Button fields, mapped in order onto canonical plane-0 bits.
    pub buttons: Vec<HidField>,
    /// Axis fields, mapped in order onto [`GenericCtrl::axes`].
    pub axes: Vec<HidField>,
}

pub struct HidGenericDecoder {
    pub report_meta: HidReportMeta,
}

impl WirelessDecoder for HidGenericDecoder {
    fn decode(&self, state: &mut DecodeState, report: &[u8], ctrl: &mut GenericCtrl) -> DecodeResult<()> {
        let reader = BitReader::new(report);
        let meta = &self.report_meta;

        state.ensure_initialized(|mapping| {
            mapping.mask[0] = if meta.buttons.len() >= 32 {
                u32::MAX
            } else {
                (1u32 << meta.buttons.len()) - 1
            };
            for (i, _) in meta.buttons.iter().enumerate().take(32) {
                mapping.btns_mask[i] = Some((0, i as u8));
            }
            vec![]
        });
        ctrl.clear_cycle();
        ctrl.mask = state.mapping.mask;

        for (i, field) in meta.buttons.iter().enumerate().take(32) {
            let Some(bit) = reader.read_unsigned(field.bit_offset, field.bit_width) else {
                return Err(DecodeError::ShortReport {
                    need: (field.bit_offset + field.bit_width + 7) / 8,
                    got: report.len(),
                });
            };
            if bit != 0 {
                ctrl.set_button(0, i as u32);
            }
        }

        if ctrl.axes.is_empty() {
            for field in &meta.axes {
                let axis_meta = Arc::new(AxisMeta {
                    neutral: (field.logical_max + field.logical_min) / 2,
                    abs_min: field.logical_min - (field.logical_max + field.logical_min) / 2,
                    abs_max: field.logical_max - (field.logical_max + field.logical_min) / 2,
                    logical_min: field.logical_min,
                    logical_max: field.logical_max,
                    ..Default::default()
                });
                ctrl.axes.push(AxisEntry::new(axis_meta));
            }
        }
        for (entry, field) in ctrl.axes.iter_mut().zip(meta.axes.iter()) {
            let Some(raw) = reader.read_signed(field.bit_offset, field.bit_width) else {
                return Err(DecodeError::ShortReport {
                    need: (field.bit_offset + field.bit_width + 7) / 8,
                    got: report.len(),
                });
            };
            entry.value = entry.meta.clamp(raw - entry.meta.neutral);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_arbitrary_bit_offset_button() {
        let mut state = DecodeState::new();
        let mut ctrl = GenericCtrl::new();
        let meta = HidReportMeta {
            buttons: vec![HidField {
                bit_offset: 3,
                bit_width: 1,
                logical_min: 0,
                logical_max: 1,
                is_axis: false,
            }],
            axes: vec![],
        };
        let decoder = HidGenericDecoder { report_meta: meta };
        let report = [0b0000_1000u8];
        decoder.decode(&mut state, &report, &mut ctrl).unwrap();
        assert!(ctrl.button(0, 0));
    }
}
