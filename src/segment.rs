use std::fmt::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::shader::{ShaderDocument, ShaderStage, StageSet};

pub const STAGE_DIRECTIVE: &str = "#shader";
pub const VERSION_DIRECTIVE: &str = "#version";

/// Header prepended to every stage source. Input `#version` lines are
/// stripped so this is the only one the toolchain ever sees.
pub const VERSION_HEADER: &str = "#version 460 core";

/// Entry point every stage must define.
pub const ENTRY_POINT: &str = "main";

/// Macros injected into every stage, before any user macros.
pub const DEFAULT_MACROS: &[(&str, &str)] = &[("SPIRV", "1")];

/// What to do when a document declares the same stage twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateStagePolicy {
    /// Fail the whole document.
    #[default]
    Reject,
    /// Keep the first block, warn and drop the duplicate block.
    SkipBlock,
}

/// What to do when an extracted stage has no entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingEntryPointPolicy {
    /// Fail the whole document.
    #[default]
    Reject,
    /// Warn and drop the stage from the document.
    DropStage,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentOptions {
    pub duplicate_stage: DuplicateStagePolicy,
    pub missing_entry_point: MissingEntryPointPolicy,
}

impl SegmentOptions {
    pub fn lenient() -> Self {
        Self {
            duplicate_stage: DuplicateStagePolicy::SkipBlock,
            missing_entry_point: MissingEntryPointPolicy::DropStage,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SegmentError {
    #[error("duplicate {0} stage declaration")]
    DuplicateStage(ShaderStage),

    #[error("{0} stage has no \"{ENTRY_POINT}\" entry point")]
    MissingEntryPoint(ShaderStage),
}

/// Classify a stage-declaration directive. `line` must already be trimmed
/// and lower-cased. Matching is keyword based; the first table hit wins.
pub fn detect_stage(line: &str) -> Option<ShaderStage> {
    if line.contains("vertex") {
        Some(ShaderStage::Vertex)
    } else if line.contains("fragment") || line.contains("pixel") {
        Some(ShaderStage::Fragment)
    } else if line.contains("geometry") {
        Some(ShaderStage::Geometry)
    } else if line.contains("compute") {
        Some(ShaderStage::Compute)
    } else if line.contains("tessellation") {
        if line.contains("control") {
            Some(ShaderStage::TessellationControl)
        } else if line.contains("evaluation") {
            Some(ShaderStage::TessellationEvaluation)
        } else {
            None
        }
    } else {
        None
    }
}

/// Split a document into per-stage sources. Lines belong to the most recent
/// `#shader` directive; lines before the first directive and all `#version`
/// lines are dropped. Each non-empty stage is checked for an entry point and
/// then gets the version header plus macro definitions prepended.
pub fn segment(
    path: PathBuf,
    source: String,
    user_macros: &[(String, String)],
    options: SegmentOptions,
) -> Result<ShaderDocument, SegmentError> {
    let mut declared = StageSet::empty();
    let mut buffers: [String; 6] = Default::default();
    let mut cursor: Option<ShaderStage> = None;

    for line in source.lines() {
        let directive = line.trim().to_ascii_lowercase();

        if directive.starts_with(STAGE_DIRECTIVE) {
            match detect_stage(&directive) {
                Some(stage) if declared.contains(stage.flag()) => {
                    match options.duplicate_stage {
                        DuplicateStagePolicy::Reject => {
                            return Err(SegmentError::DuplicateStage(stage));
                        }
                        DuplicateStagePolicy::SkipBlock => {
                            warn!(stage = %stage, "duplicate stage declaration, dropping block");
                            cursor = None;
                        }
                    }
                }
                Some(stage) => {
                    declared.insert(stage.flag());
                    cursor = Some(stage);
                }
                None => {
                    warn!(directive = directive.as_str(), "unrecognized stage directive");
                }
            }
        } else if directive.starts_with(VERSION_DIRECTIVE) {
            debug!(directive = directive.as_str(), "dropping redundant version directive");
        } else if let Some(stage) = cursor {
            let buffer = &mut buffers[stage.index()];
            buffer.push_str(line);
            buffer.push('\n');
        }
    }

    let mut document = ShaderDocument::new(path, source);

    for stage in ShaderStage::ALL {
        if !declared.contains(stage.flag()) {
            continue;
        }

        let body = std::mem::take(&mut buffers[stage.index()]);

        if body.is_empty() {
            document.add_stage(stage);
            continue;
        }

        if !has_entry_point(&body) {
            match options.missing_entry_point {
                MissingEntryPointPolicy::Reject => {
                    return Err(SegmentError::MissingEntryPoint(stage));
                }
                MissingEntryPointPolicy::DropStage => {
                    warn!(stage = %stage, "stage has no entry point, dropping it");
                    continue;
                }
            }
        }

        document.add_stage(stage);
        document.set_source(stage, inject_macros(&body, DEFAULT_MACROS, user_macros));
    }

    Ok(document)
}

fn has_entry_point(body: &str) -> bool {
    body.to_ascii_lowercase().contains(ENTRY_POINT)
}

/// Prepend the version header, the default macros and the user macros, in
/// that order, to a stage body. Not idempotent; called once per stage.
pub fn inject_macros(
    body: &str,
    defaults: &[(&str, &str)],
    user: &[(String, String)],
) -> String {
    let mut source = String::with_capacity(body.len() + 64);

    source.push_str(VERSION_HEADER);
    source.push('\n');

    for (name, value) in defaults {
        writeln!(source, "#define {name} {value}").unwrap();
    }

    for (name, value) in user {
        writeln!(source, "#define {name} {value}").unwrap();
    }

    source.push_str(body);
    source
}
