//! The mapping/translation engine (spec.md §4.7): applies per-source
//! mapping rules to produce per-output-port generic state.
use crate::error::{MappingError, MappingResult};
use crate::model::GenericCtrl;

/// How a source value contributes to its destination; `algo` in spec.md's
/// mapping rule struct. Only `Direct` is exercised by the testable
/// properties; `Invert` is a natural extension the config model also
/// supports (negated polarity on write).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum MapAlgo {
    #[default]
    Direct,
    Invert,
}

/// `{src_btn, dst_btn, dst_id, turbo, algo, perc_max, perc_threshold,
/// perc_deadzone}` (spec.md §3).
#[derive(Clone, Copy, Debug)]
pub struct MappingRule {
    /// Source index 0..127: bits 0..4 select the bit, bits 5..6 the plane.
    pub src_index: u8,
    pub dst_index: u8,
    /// Destination wired port.
    pub dst_id: u8,
    /// `Some(cnt_mask)` enables turbo at the given cadence mask.
    pub turbo: Option<u8>,
    pub algo: MapAlgo,
    pub perc_max: u8,
    pub perc_threshold: u8,
    pub perc_deadzone: u8,
}

fn decode_index(index: u8) -> MappingResult<(usize, u32)> {
    if index > 127 {
        return Err(MappingError::InvalidSourceIndex(index));
    }
    let plane = ((index >> 5) & 0x3) as usize;
    let bit = (index & 0x1F) as u32;
    Ok((plane, bit))
}

fn sign(polarity: i8, asserted: bool) -> i32 {
    if asserted {
        polarity as i32
    } else {
        -(polarity as i32)
    }
}

/// Applies `rules` against `input`, writing into `outputs[dst_id]`. Returns
/// a bit-set of affected output ports (spec.md §4.7 final paragraph).
pub fn apply_rules(
    input: &GenericCtrl,
    rules: &[MappingRule],
    outputs: &mut [GenericCtrl],
) -> MappingResult<u32> {
    let mut affected = 0u32;
    for rule in rules {
        let (src_plane, src_bit) = decode_index(rule.src_index)
            .map_err(|_| MappingError::InvalidSourceIndex(rule.src_index))?;
        let (dst_plane, dst_bit) = decode_index(rule.dst_index)
            .map_err(|_| MappingError::InvalidDestinationIndex(rule.dst_index))?;
        let port = rule.dst_id as usize;
        let output = outputs
            .get_mut(port)
            .ok_or(MappingError::InvalidDestinationIndex(rule.dst_id))?;

        let src_is_axis = input.is_axis_bit(src_plane, src_bit);
        let dst_is_axis = output.is_axis_bit(dst_plane, dst_bit);

        if src_is_axis {
            let Some(axis_i) = input.axis_index_for(src_plane, src_bit) else {
                continue;
            };
            let axis = &input.axes[axis_i];
            let magnitude = axis.value.unsigned_abs() as i64;
            let abs_max = axis.meta.abs_max.max(1) as i64;
            if dst_is_axis {
                let Some(out_axis_i) = output.axis_index_for(dst_plane, dst_bit) else {
                    continue;
                };
                let polarity = output.axes[out_axis_i].meta.polarity;
                let scaled =
                    abs_max * sign(polarity, axis.value >= 0) as i64 * rule.perc_max as i64 / 100;
                output.axes[out_axis_i].value = output.axes[out_axis_i].meta.clamp(scaled as i32);
            } else {
                // property 3: destination button asserts iff axis magnitude
                // exceeds perc_threshold% of abs_max.
                let threshold = abs_max * rule.perc_threshold as i64 / 100;
                if magnitude > threshold {
                    output.set_button(dst_plane, dst_bit);
                }
            }
        } else if input.button(src_plane, src_bit) {
            output.set_button(dst_plane, dst_bit);
        }

        output.map_mask[dst_plane] |= 1 << dst_bit;
        affected |= 1 << port;
    }
    Ok(affected)
}

/// Per-destination-button turbo cadence, recorded by the mapping engine
/// from rules with `turbo = Some(cnt_mask)` (spec.md §4.8: "the mapping
/// engine records per-destination-button cadence mask").
#[derive(Clone, Debug)]
pub struct TurboTable {
    cadence: [[Option<u8>; 32]; crate::model::NUM_BTN_PLANES],
}

impl Default for TurboTable {
    fn default() -> Self {
        Self {
            cadence: [[None; 32]; crate::model::NUM_BTN_PLANES],
        }
    }
}

impl TurboTable {
    pub fn from_rules(rules: &[MappingRule]) -> MappingResult<Self> {
        let mut table = Self::default();
        for rule in rules {
            let Some(cnt_mask) = rule.turbo else { continue };
            let (plane, bit) = decode_index(rule.dst_index)
                .map_err(|_| MappingError::InvalidDestinationIndex(rule.dst_index))?;
            table.cadence[plane][bit as usize] = Some(cnt_mask);
        }
        Ok(table)
    }

    pub fn cadence_for(&self, plane: usize, bit: u32) -> Option<u8> {
        self.cadence[plane][bit as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AxisEntry, AxisMeta};
    use std::sync::Arc;

    #[test]
    fn identity_rule_copies_source_bit() {
        let mut input = GenericCtrl::new();
        input.set_button(0, 3);
        let rule = MappingRule {
            src_index: 3,
            dst_index: 3,
            dst_id: 0,
            turbo: None,
            algo: MapAlgo::Direct,
            perc_max: 100,
            perc_threshold: 0,
            perc_deadzone: 0,
        };
        let mut outputs = vec![GenericCtrl::new()];
        let affected = apply_rules(&input, &[rule], &mut outputs).unwrap();
        assert_eq!(affected, 1);
        assert!(outputs[0].button(0, 3));
    }

    #[test]
    fn axis_to_button_threshold_property() {
        let mut input = GenericCtrl::new();
        input.desc[0] = 1; // bit 0 of plane 0 is an axis
        let meta = Arc::new(AxisMeta {
            abs_max: 100,
            ..Default::default()
        });
        input.axes.push(AxisEntry {
            value: 60,
            meta: meta.clone(),
        });
        let rule = MappingRule {
            src_index: 0,
            dst_index: 5,
            dst_id: 0,
            turbo: None,
            algo: MapAlgo::Direct,
            perc_max: 100,
            perc_threshold: 50,
            perc_deadzone: 0,
        };
        let mut outputs = vec![GenericCtrl::new()];
        apply_rules(&input, &[rule], &mut outputs).unwrap();
        assert!(outputs[0].button(0, 5));

        input.axes[0].value = 30;
        let mut outputs2 = vec![GenericCtrl::new()];
        apply_rules(&input, &[rule], &mut outputs2).unwrap();
        assert!(!outputs2[0].button(0, 5));
    }
}
