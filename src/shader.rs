use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;

/// One shader translation unit kind. The discriminant order is the slot and
/// tag order of the binary container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessellationControl,
        ShaderStage::TessellationEvaluation,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<ShaderStage> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn flag(self) -> StageSet {
        StageSet::from_bits_truncate(1 << self.index())
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessellationControl => "tessellation control",
            ShaderStage::TessellationEvaluation => "tessellation evaluation",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSet(u32);

bitflags! {
    impl StageSet: u32 {
        const VERTEX = 1 << 0;
        const TESSELLATION_CONTROL = 1 << 1;
        const TESSELLATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;

        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::TESSELLATION_CONTROL.bits()
            | Self::TESSELLATION_EVALUATION.bits()
            | Self::GEOMETRY.bits()
            | Self::FRAGMENT.bits();
    }
}

/// One stage slot of a document: the extracted, macro-injected source and,
/// once compiled, the stage's SPIR-V words. An empty source means the stage
/// is absent and every downstream step skips the slot.
#[derive(Debug, Default)]
pub struct SubShader {
    source: String,
    spirv: Vec<u32>,
}

impl SubShader {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn spirv(&self) -> &[u32] {
        &self.spirv
    }
}

/// One input `.shader` file: its path, the original text as loaded, the set
/// of stages declared so far and the six per-stage slots.
#[derive(Debug)]
pub struct ShaderDocument {
    path: PathBuf,
    source: String,
    stages: StageSet,
    slots: [SubShader; 6],
}

impl ShaderDocument {
    pub fn new(path: PathBuf, source: String) -> Self {
        Self {
            path,
            source,
            stages: StageSet::empty(),
            slots: Default::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn stages(&self) -> StageSet {
        self.stages
    }

    pub fn slot(&self, stage: ShaderStage) -> &SubShader {
        &self.slots[stage.index()]
    }

    pub(crate) fn add_stage(&mut self, stage: ShaderStage) {
        self.stages.insert(stage.flag());
    }

    pub(crate) fn set_source(&mut self, stage: ShaderStage, source: String) {
        self.slots[stage.index()].source = source;
    }

    pub(crate) fn set_spirv(&mut self, stage: ShaderStage, spirv: Vec<u32>) {
        self.slots[stage.index()].spirv = spirv;
    }

    /// Slots holding compiled bytecode, in slot order.
    pub fn compiled_slots(&self) -> impl Iterator<Item = (ShaderStage, &SubShader)> {
        ShaderStage::ALL
            .into_iter()
            .map(|stage| (stage, self.slot(stage)))
            .filter(|(_, slot)| !slot.spirv.is_empty())
    }
}
