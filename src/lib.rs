//! Post-silicon RTL patch compiler: weaves observe/control ports through an
//! instance hierarchy, then compiles sequence and rewrite programs into the
//! SMU/SRU bitstreams that program the resulting patch block.

pub mod bits;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod interface;
pub mod lang;
pub mod patchblock;
pub mod pragma;
pub mod rtl;
pub mod smu;
pub mod sru;
pub mod transform;

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::info;

use config::AsapConfig;
use error::{AsapError, Result};
use hierarchy::ModuleRegistry;
use lang::{rewrite, sequence};

/// Everything the core needs to run one compile: the resolved config, the
/// RTL source files (already read into memory), and the sequence/rewrite
/// program texts.
pub struct PipelineInputs<'a> {
    pub config: &'a AsapConfig,
    pub sources: &'a [(PathBuf, String)],
    pub sequence_source: &'a str,
    pub rewrite_source: &'a str,
}

/// Every artifact the pipeline produces, ready to be written to the output
/// directory (`spec.md` §6).
pub struct PipelineOutputs {
    pub emitted_rtl: HashMap<String, String>,
    pub smu_stream: String,
    pub sru_stream: String,
    pub interface_json: String,
    pub patch_block: String,
}

/// Runs the whole compile, single-threaded and fail-fast (`spec.md` §5):
/// RTL transform to completion, then SMU compile, then SRU compile.
pub fn run(inputs: PipelineInputs<'_>) -> Result<PipelineOutputs> {
    let PipelineInputs {
        config,
        sources,
        sequence_source,
        rewrite_source,
    } = inputs;

    let pragmas_by_file = pragma::scan_filelist(sources)?;

    let mut registry = ModuleRegistry::new();
    let mut module_files = HashMap::new();
    for (path, text) in sources {
        let modules = rtl::parse_modules(text)?;
        let file_key = path.display().to_string();
        for module in modules {
            module_files.insert(module.name.clone(), file_key.clone());
            registry.insert(module.name.clone(), module);
        }
    }

    let tree = hierarchy::build_instance_tree(&registry, &config.top_module)?;
    let (observe, control, control_types) = hierarchy::build_catalogues(&tree, &registry, &pragmas_by_file, &module_files)?;

    let mut stage1 = HashMap::new();
    for (name, module) in &registry {
        let empty = pragma::FilePragmas::new();
        let pragmas = module_files
            .get(name)
            .and_then(|file| pragmas_by_file.get(file))
            .unwrap_or(&empty);
        stage1.insert(name.clone(), transform::rewrite_module(module, pragmas));
    }

    let woven_widths = transform::weave_hierarchy(&tree, &stage1);

    let mut emitted_rtl = HashMap::new();
    for (name, result) in &stage1 {
        let mut module = result.module.clone();
        let widths = woven_widths.get(name).copied().unwrap_or_default();
        transform::apply_woven_ports(&mut module, widths, result, &woven_widths);
        let file = module_files.get(name).cloned().unwrap_or_else(|| format!("{name}.v"));
        emitted_rtl.insert(file, rtl::emit_module(&module));
    }

    let sequences = sequence::parse(sequence_source)?;
    let smu_config = smu::compile(&sequences, &observe, config)?;
    let smu_stream = smu::serialize(&smu_config);

    let rewrite_nodes = rewrite::parse(rewrite_source)?;
    let sru_config = sru::compile(&rewrite_nodes, &control, &control_types, config)?;
    let sru_stream = sru::serialize(&sru_config, &smu_config.trigger_index, config.sru_segment_size);

    let interface_json = interface::write(&observe, &control, &control_types)?;
    let observe_width = observe.width();
    let patch_block = patchblock::render(config, observe_width, &control, &control_types);

    info!(
        modules = emitted_rtl.len(),
        smu_bits = smu_stream.split(' ').count(),
        sru_bits = sru_stream.split(' ').count(),
        "pipeline run complete"
    );

    Ok(PipelineOutputs {
        emitted_rtl,
        smu_stream,
        sru_stream,
        interface_json,
        patch_block,
    })
}
