//! SMU (sequence matching unit) compiler (`spec.md` §4.4 C4).
//!
//! Grounded in `ASAPCompiler.ASAPSmuCompiler`: lowers the observability
//! catalogue's geometry and the sequence program into a fixed-layout,
//! cycle-major configuration table, then serializes it bit-exactly.

use std::collections::HashMap;

use crate::bits::BitWriter;
use crate::catalogue::SignalCatalogue;
use crate::config::AsapConfig;
use crate::error::{AsapError, Result};
use crate::lang::ast::{Comparison, Pattern, Sequence, SequenceList};

/// One field slot of the fixed-layout SMU configuration table, enum order
/// matching `spec.md` §4.4 (`SMU_ENB, INP_SEL, CMP_VAL, MASK, FSM_CMP,
/// CMP_SEL`); the wire format emits fields in the *reverse* of this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSlot {
    pub smu_enb: bool,
    pub inp_sel: u32,
    pub cmp_val: u32,
    pub mask: u32,
    pub fsm_cmp: u32,
    pub cmp_sel: Comparison,
}

impl Default for CycleSlot {
    fn default() -> Self {
        CycleSlot {
            smu_enb: false,
            inp_sel: 0,
            cmp_val: 0,
            mask: 0,
            fsm_cmp: 0,
            cmp_sel: Comparison::Pass,
        }
    }
}

/// Field widths derived from catalogue geometry and configuration
/// (`spec.md` §4.4 "Catalogue geometry").
#[derive(Debug, Clone, Copy)]
pub struct FieldWidths {
    pub seg: u32,
    pub segments: u32,
    pub smu_enb: u32,
    pub inp_sel: u32,
    pub cmp_val: u32,
    pub mask: u32,
    pub fsm_cmp: u32,
    pub cmp_sel: u32,
}

fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

pub fn field_widths(observe_width: u32, config: &AsapConfig) -> FieldWidths {
    let seg = config.smu_segment_size;
    let segments = observe_width.div_ceil(seg).max(1);
    FieldWidths {
        seg,
        segments,
        smu_enb: 1,
        inp_sel: ceil_log2(segments),
        cmp_val: seg,
        mask: seg,
        fsm_cmp: ceil_log2(config.max_seq_depth),
        cmp_sel: 2,
    }
}

/// The fixed-layout configuration table: `cells[cycle][trigger]`.
pub struct SmuConfig {
    pub cells: Vec<Vec<CycleSlot>>,
    pub trigger_index: HashMap<String, usize>,
    pub widths: FieldWidths,
}

fn lower_pattern(pattern: &Pattern, catalogue: &SignalCatalogue, widths: &FieldWidths) -> Result<(u32, u32, u32, Comparison)> {
    match pattern {
        Pattern::Pass => Ok((0, 0, 0, Comparison::Pass)),
        Pattern::Compare { var, op, constant } => {
            let context = format!("variable `{}`", var.name);
            let range = crate::catalogue::resolve(catalogue, &var.name).ok_or_else(|| AsapError::UnknownSignal {
                signal: var.name.clone(),
                context: context.clone(),
            })?;
            let (obs_msb, obs_lsb) = (range[0], range[1]);
            let span = obs_msb - obs_lsb;
            if var.lsb > var.msb || var.msb > span {
                return Err(AsapError::PatternRange {
                    signal: var.name.clone(),
                    context: context.clone(),
                    reason: format!("[{}:{}] exceeds catalogue span [{}:0]", var.msb, var.lsb, span),
                });
            }
            let seg = widths.seg;
            let seg_index = obs_lsb / seg;
            let base = obs_lsb % seg;
            let field_width = var.msb - var.lsb + 1;
            let shift = base + var.lsb;
            if shift + field_width > seg {
                return Err(AsapError::SegmentCrossing {
                    signal: var.name.clone(),
                    context,
                });
            }
            let ones: u64 = if field_width >= 64 { u64::MAX } else { (1u64 << field_width) - 1 };
            let mask = ((ones << shift) & mask_for_width(seg)) as u32;
            let cmp_val = ((constant.value() << shift) & mask_for_width(seg)) as u32;
            if (cmp_val as u64) & !(mask as u64) != 0 {
                return Err(AsapError::InternalEncoding {
                    reason: format!("CMP_VAL for `{}` escapes its MASK", var.name),
                });
            }
            Ok((seg_index, cmp_val, mask, *op))
        }
    }
}

fn mask_for_width(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Lowers a whole sequence program into the fixed-layout table
/// (`spec.md` §4.4 "Per-sequence lowering").
pub fn compile(sequences: &SequenceList, catalogue: &SignalCatalogue, config: &AsapConfig) -> Result<SmuConfig> {
    if sequences.sequences.len() > config.max_triggers as usize {
        return Err(AsapError::TooManySequences {
            count: sequences.sequences.len(),
            max: config.max_triggers as usize,
        });
    }

    // catalogue width: max observed msb + 1, per `spec.md` §4.4.
    let mut observe_width = 0u32;
    catalogue.for_each_leaf(&mut |_path, range| observe_width = observe_width.max(range[0] + 1));
    let widths = field_widths(observe_width, config);

    let depth = config.max_seq_depth as usize;
    let triggers = config.max_triggers as usize;
    let mut cells = vec![vec![CycleSlot::default(); triggers]; depth];
    let mut trigger_index = HashMap::new();

    for (trigger, sequence) in sequences.sequences.iter().enumerate() {
        trigger_index.insert(sequence.name.clone(), trigger);
        populate_sequence(sequence, trigger, catalogue, &widths, &mut cells)?;
    }

    Ok(SmuConfig { cells, trigger_index, widths })
}

fn populate_sequence(
    sequence: &Sequence,
    trigger: usize,
    catalogue: &SignalCatalogue,
    widths: &FieldWidths,
    cells: &mut [Vec<CycleSlot>],
) -> Result<()> {
    if sequence.patterns.len() > cells.len() {
        return Err(AsapError::TriggerOverflow {
            name: sequence.name.clone(),
            count: sequence.patterns.len(),
            max: cells.len(),
        });
    }
    let fsm_cmp = (sequence.patterns.len().max(1) - 1) as u32;
    for (cycle, pattern) in sequence.patterns.iter().enumerate() {
        let (inp_sel, cmp_val, mask, cmp_sel) = lower_pattern(pattern, catalogue, widths)?;
        cells[cycle][trigger] = CycleSlot {
            smu_enb: true,
            inp_sel,
            cmp_val,
            mask,
            fsm_cmp,
            cmp_sel,
        };
    }
    Ok(())
}

/// Bit-exact bitstream serialization (`spec.md` §4.4 "Bitstream ordering"):
/// cycle outermost, then trigger, then fields in `CMP_SEL, FSM_CMP, MASK,
/// CMP_VAL, INP_SEL, SMU_ENB` order.
pub fn serialize(config: &SmuConfig) -> String {
    let w = &config.widths;
    let mut writer = BitWriter::new();
    for cycle in &config.cells {
        for slot in cycle {
            writer.push_bits(u8::from(slot.cmp_sel) as u64, w.cmp_sel);
            writer.push_bits(slot.fsm_cmp as u64, w.fsm_cmp);
            writer.push_bits(slot.mask as u64, w.mask);
            writer.push_bits(slot.cmp_val as u64, w.cmp_val);
            writer.push_bits(slot.inp_sel as u64, w.inp_sel);
            writer.push_bits(slot.smu_enb as u64, w.smu_enb);
        }
    }
    writer.into_wire_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::SignalCatalogue;
    use crate::lang::sequence;

    fn config() -> AsapConfig {
        AsapConfig {
            top_module: "TOP".to_string(),
            filelist: "f.lst".into(),
            smu_segment_size: 4,
            max_seq_depth: 2,
            max_triggers: 2,
            sru_segment_size: 4,
            sru_num_pla: 2,
        }
    }

    fn catalogue() -> SignalCatalogue {
        let mut cat = SignalCatalogue::empty_branch();
        cat.insert(&["TOP", "A"], [3, 0]);
        cat.insert(&["TOP", "B"], [9, 4]);
        cat
    }

    #[test]
    fn empty_pattern_lowers_to_all_zero_pass() {
        let list = sequence::parse("s0 { () }").unwrap();
        let cfg = compile(&list, &catalogue(), &config()).unwrap();
        let slot = cfg.cells[0][0];
        assert_eq!(slot.cmp_sel, Comparison::Pass);
        assert_eq!(slot.mask, 0);
        assert!(slot.smu_enb);
    }

    #[test]
    fn compare_pattern_computes_mask_and_cmp_val() {
        let list = sequence::parse("s0 { (TOP.A[1:0] == 2'b10) }").unwrap();
        let cfg = compile(&list, &catalogue(), &config()).unwrap();
        let slot = cfg.cells[0][0];
        assert_eq!(slot.cmp_sel, Comparison::Eq);
        assert_eq!(slot.mask, 0b0011);
        assert_eq!(slot.cmp_val, 0b0010);
        assert_eq!(slot.inp_sel, 0);
    }

    #[test]
    fn signal_fully_inside_one_segment_is_accepted() {
        let list = sequence::parse("s0 { (TOP.A[3:0] == 4'b0000) }").unwrap();
        // SEG=4, signal spans all 4 bits starting at base 0: fits exactly, no crossing.
        assert!(compile(&list, &catalogue(), &config()).is_ok());
    }

    #[test]
    fn signal_spanning_a_segment_boundary_is_rejected() {
        // TOP.B sits at catalogue [9:4]; base = 4 % SEG(4) = 0, full 6-bit
        // width overruns the 4-bit segment.
        let list = sequence::parse("s0 { (TOP.B[5:0] == 6'b000000) }").unwrap();
        let err = compile(&list, &catalogue(), &config()).unwrap_err();
        assert!(matches!(err, AsapError::SegmentCrossing { .. }));
    }

    #[test]
    fn sub_range_starting_past_bit_zero_can_still_cross_a_segment() {
        // TOP.A sits at catalogue [3:0] (SEG=4); selecting its own bits
        // [3:2] lands at absolute offset 2..3 within the segment and fits,
        // but selecting [5:2] (var indices relative to the signal) would
        // overrun the 4-bit segment even though its base offset is 0.
        let mut cat = SignalCatalogue::empty_branch();
        cat.insert(&["TOP", "A"], [5, 0]);
        let fits = sequence::parse("s0 { (TOP.A[3:2] == 2'b00) }").unwrap();
        assert!(compile(&fits, &cat, &config()).is_ok());

        let crosses = sequence::parse("s0 { (TOP.A[5:2] == 4'b0000) }").unwrap();
        let err = compile(&crosses, &cat, &config()).unwrap_err();
        assert!(matches!(err, AsapError::SegmentCrossing { .. }));
    }

    #[test]
    fn unknown_signal_fails() {
        let list = sequence::parse("s0 { (TOP.C[0:0] == 1'b1) }").unwrap();
        let err = compile(&list, &catalogue(), &config()).unwrap_err();
        assert!(matches!(err, AsapError::UnknownSignal { .. }));
    }

    #[test]
    fn too_many_sequences_fails() {
        let list = sequence::parse("s0 { () } s1 { () } s2 { () }").unwrap();
        assert!(compile(&list, &catalogue(), &config()).is_err());
    }

    #[test]
    fn sequence_deeper_than_max_seq_depth_fails_fast_instead_of_panicking() {
        // config().max_seq_depth == 2; three patterns in one sequence must
        // be rejected before any `cells[cycle][..]` indexing is attempted.
        let list = sequence::parse(
            "s0 { (TOP.A[0:0] == 1'b1) (TOP.A[0:0] == 1'b0) (TOP.A[0:0] == 1'b1) }",
        )
        .unwrap();
        let err = compile(&list, &catalogue(), &config()).unwrap_err();
        assert!(matches!(err, AsapError::TriggerOverflow { count: 3, max: 2, .. }));
    }

    #[test]
    fn serialize_produces_one_bit_char_per_space_separated_token() {
        let list = sequence::parse("s0 { () }").unwrap();
        let cfg = compile(&list, &catalogue(), &config()).unwrap();
        let wire = serialize(&cfg);
        for token in wire.split(' ') {
            assert_eq!(token.len(), 1);
            assert!(token == "0" || token == "1");
        }
    }
}
