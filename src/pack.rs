use std::io::{self, Write};

use crate::shader::{ShaderDocument, ShaderStage, StageSet};

// Pack layout: u32 stage count, then for each compiled stage in slot order
// { u32 word count, u32 stage tag, word count x u32 SPIR-V words }. Header
// fields are little-endian; words keep the order the toolchain produced.

/// Serialize a compiled document's stages into the pack format.
pub fn write(document: &ShaderDocument, mut out: impl Write) -> io::Result<()> {
    let slots: Vec<_> = document.compiled_slots().collect();

    out.write_all(&(slots.len() as u32).to_le_bytes())?;

    for (stage, slot) in slots {
        let words = slot.spirv();

        out.write_all(&(words.len() as u32).to_le_bytes())?;
        out.write_all(&stage.tag().to_le_bytes())?;
        out.write_all(bytemuck::cast_slice(words))?;
    }

    Ok(())
}

pub fn to_bytes(document: &ShaderDocument) -> Vec<u8> {
    let mut bytes = Vec::new();
    write(document, &mut bytes).unwrap();
    bytes
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PackError {
    #[error("truncated shader pack")]
    Truncated,

    #[error("unknown stage tag {0}")]
    UnknownStage(u32),
}

#[derive(Debug)]
pub struct PackEntry {
    pub stage: ShaderStage,
    pub spirv: Vec<u32>,
}

/// The consuming side of the pack format. Used by engines loading `.spirv`
/// files and by the round-trip tests.
#[derive(Debug)]
pub struct ShaderPack {
    entries: Vec<PackEntry>,
}

impl ShaderPack {
    pub fn from_bytes(data: &[u8]) -> Result<Self, PackError> {
        let mut at = 0;
        let count = read_u32(data, &mut at)?;

        let mut entries = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let word_count = read_u32(data, &mut at)?;
            let tag = read_u32(data, &mut at)?;
            let stage = ShaderStage::from_tag(tag).ok_or(PackError::UnknownStage(tag))?;

            let mut spirv = Vec::with_capacity(word_count as usize);
            for _ in 0..word_count {
                spirv.push(read_u32(data, &mut at)?);
            }

            entries.push(PackEntry { stage, spirv });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PackEntry] {
        &self.entries
    }

    pub fn stages(&self) -> StageSet {
        self.entries
            .iter()
            .fold(StageSet::empty(), |set, entry| set | entry.stage.flag())
    }

    pub fn spirv(&self, stage: ShaderStage) -> Option<&[u32]> {
        self.entries
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.spirv.as_slice())
    }
}

fn read_u32(data: &[u8], at: &mut usize) -> Result<u32, PackError> {
    let bytes = data
        .get(*at..*at + 4)
        .ok_or(PackError::Truncated)?
        .try_into()
        .unwrap();

    *at += 4;

    Ok(u32::from_le_bytes(bytes))
}
