//! Emits the top patch-block RTL (`asapTop.v`, `spec.md` §6).
//!
//! Grounded in `ASAPInsertion.TopPatchBlockGenerator`/`ControlSignalMappingModel`:
//! the controllability catalogue is reordered into a `{signal controls,
//! clock controls}` bus, `qIn`/`qOut` are rewired through that reorder map,
//! and a `patchBlock` module instantiates `smu`/`sru` wired to it.

use crate::catalogue::{ControlType, SignalCatalogue, TypeCatalogue};
use crate::config::AsapConfig;

/// One controllability-catalogue leaf's original and reordered bit range.
#[derive(Debug, Clone, Copy)]
pub struct ReorderEntry {
    pub orig_msb: u32,
    pub orig_lsb: u32,
    pub reordered_msb: u32,
    pub reordered_lsb: u32,
}

/// Builds the `{signal controls, clock controls}` reorder map (`spec.md` §8
/// reorder invariant): signal-typed leaves occupy `[0, S-1]`, clock-typed
/// leaves occupy `[S, S+C-1]`, each group ordered by original LSB.
pub fn build_reorder_map(control: &SignalCatalogue, types: &TypeCatalogue) -> (Vec<ReorderEntry>, u32, u32) {
    let mut signals = Vec::new();
    let mut clocks = Vec::new();
    control.for_each_leaf(&mut |path, range| {
        let control_type = types.get(path).copied().unwrap_or(ControlType::Signal);
        match control_type {
            ControlType::Signal => signals.push(*range),
            ControlType::Clock => clocks.push(*range),
        }
    });
    signals.sort_by_key(|r| r[1]);
    clocks.sort_by_key(|r| r[1]);

    let mut entries = Vec::with_capacity(signals.len() + clocks.len());
    let mut cursor = 0u32;
    for [msb, lsb] in &signals {
        let width = msb - lsb;
        entries.push(ReorderEntry {
            orig_msb: *msb,
            orig_lsb: *lsb,
            reordered_msb: cursor + width,
            reordered_lsb: cursor,
        });
        cursor += width + 1;
    }
    let num_signal = cursor;
    for [msb, lsb] in &clocks {
        let width = msb - lsb;
        entries.push(ReorderEntry {
            orig_msb: *msb,
            orig_lsb: *lsb,
            reordered_msb: cursor + width,
            reordered_lsb: cursor,
        });
        cursor += width + 1;
    }
    let num_clock = cursor - num_signal;
    (entries, num_signal, num_clock)
}

/// Renders the `patchBlock` top-level RTL module (`spec.md` §6).
pub fn render(config: &AsapConfig, observe_width: u32, control: &SignalCatalogue, types: &TypeCatalogue) -> String {
    let (entries, num_signal, num_clock) = build_reorder_map(control, types);

    let mut body = String::new();
    body.push_str("  wire [CONTROL_WIDTH-1:0] qInInternal;\n  wire [CONTROL_WIDTH-1:0] qOutInternal;\n");
    for entry in &entries {
        body.push_str(&format!(
            "  assign qInInternal[{}:{}] = qIn[{}:{}];\n",
            entry.reordered_msb, entry.reordered_lsb, entry.orig_msb, entry.orig_lsb
        ));
        body.push_str(&format!(
            "  assign qOut[{}:{}] = qOutInternal[{}:{}];\n",
            entry.orig_msb, entry.orig_lsb, entry.reordered_msb, entry.reordered_lsb
        ));
    }
    body.push_str("  wire [M-1:0] trigger;\n\n");
    body.push_str(
        "  smu smu_inst (\n\
         \x20   .clk(clk),\n\
         \x20   .rst(rst),\n\
         \x20   .cfgClk(cfgClk),\n\
         \x20   .bitstreamSerialIn(bitstreamSerialIn),\n\
         \x20   .bitstreamValid(smuStreamValid),\n\
         \x20   .p(p),\n\
         \x20   .trigger(trigger)\n\
         \x20 );\n\n",
    );
    body.push_str(
        "  sru sru_inst (\n\
         \x20   .clk(clk),\n\
         \x20   .rst(rst),\n\
         \x20   .cfgClk(cfgClk),\n\
         \x20   .bitstreamSerialIn(bitstreamSerialIn),\n\
         \x20   .bitstreamValid(sruStreamValid),\n\
         \x20   .Qin(qInInternal),\n\
         \x20   .Qout(qOutInternal),\n\
         \x20   .trigger(trigger)\n\
         \x20 );\n",
    );

    format!(
        "module patchBlock #(\n\
         \x20 parameter N = {n},\n\
         \x20 parameter K = {k},\n\
         \x20 parameter M = {m},\n\
         \x20 parameter C = {c},\n\
         \x20 parameter S = {s},\n\
         \x20 parameter CONTROL_WIDTH = C + S,\n\
         \x20 parameter NUM_PLA = {num_pla},\n\
         \x20 parameter SRU_SEGMENT_SIZE = {sru_seg},\n\
         \x20 parameter SMU_SEGMENT_SIZE = {smu_seg}\n\
         )(\n\
         \x20 input clk,\n\
         \x20 input cfgClk,\n\
         \x20 input rst,\n\
         \x20 input bitstreamSerialIn,\n\
         \x20 input smuStreamValid,\n\
         \x20 input sruStreamValid,\n\
         \x20 input [K-1:0] p,\n\
         \x20 input [CONTROL_WIDTH-1:0] qIn,\n\
         \x20 output [CONTROL_WIDTH-1:0] qOut\n\
         );\n\n\
         {body}\
         endmodule\n",
        n = config.max_seq_depth,
        k = observe_width,
        m = config.max_triggers,
        c = num_clock,
        s = num_signal,
        num_pla = config.sru_num_pla,
        sru_seg = config.sru_segment_size,
        smu_seg = config.smu_segment_size,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AsapConfig {
        AsapConfig {
            top_module: "TOP".to_string(),
            filelist: "f.lst".into(),
            smu_segment_size: 4,
            max_seq_depth: 4,
            max_triggers: 1,
            sru_segment_size: 4,
            sru_num_pla: 2,
        }
    }

    #[test]
    fn reorder_map_puts_signals_before_clocks() {
        let mut control = SignalCatalogue::empty_branch();
        control.insert(&["TOP", "clk"], [0, 0]);
        control.insert(&["TOP", "A"], [2, 1]);
        let mut types = TypeCatalogue::empty_branch();
        types.insert(&["TOP", "clk"], ControlType::Clock);
        types.insert(&["TOP", "A"], ControlType::Signal);

        let (entries, num_signal, num_clock) = build_reorder_map(&control, &types);
        assert_eq!(num_signal, 2);
        assert_eq!(num_clock, 1);
        assert_eq!(entries.len(), 2);
        let signal_entry = entries.iter().find(|e| e.orig_lsb == 1).unwrap();
        assert_eq!((signal_entry.reordered_msb, signal_entry.reordered_lsb), (1, 0));
        let clock_entry = entries.iter().find(|e| e.orig_lsb == 0 && e.orig_msb == 0).unwrap();
        assert_eq!((clock_entry.reordered_msb, clock_entry.reordered_lsb), (2, 2));
    }

    #[test]
    fn render_produces_patch_block_module_with_parameters() {
        let mut control = SignalCatalogue::empty_branch();
        control.insert(&["TOP", "clk"], [0, 0]);
        let mut types = TypeCatalogue::empty_branch();
        types.insert(&["TOP", "clk"], ControlType::Clock);

        let text = render(&config(), 8, &control, &types);
        assert!(text.contains("module patchBlock"));
        assert!(text.contains("parameter K = 8"));
        assert!(text.contains("smu smu_inst"));
        assert!(text.contains("sru sru_inst"));
        assert!(text.contains("endmodule"));
    }
}
