use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::compile::{CompileError, ShaderCompiler};
use crate::pack;
use crate::segment::{self, SegmentError, SegmentOptions};
use crate::shader::ShaderDocument;
use crate::validate::{self, ValidateError};

pub const SHADER_SUFFIX: &str = ".shader";
pub const PACK_SUFFIX: &str = ".spirv";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("empty input file")]
    EmptyFile,

    #[error("segmentation error: {0}")]
    Segment(#[from] SegmentError),

    #[error("illegal stage combination: {0}")]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sequential batch pipeline: segments, validates, compiles and packs one
/// document at a time against a single borrowed toolchain.
pub struct Pipeline<'a> {
    compiler: &'a ShaderCompiler,
    options: SegmentOptions,
    macros: Vec<(String, String)>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        compiler: &'a ShaderCompiler,
        options: SegmentOptions,
        macros: Vec<(String, String)>,
    ) -> Self {
        Self {
            compiler,
            options,
            macros,
        }
    }

    /// Run the whole pipeline for one input file and write the pack next to
    /// it (or to `output`). Returns the path written.
    pub fn process_file(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf, Error> {
        let source = fs::read_to_string(input)?;

        if source.trim().is_empty() {
            return Err(Error::EmptyFile);
        }

        let document = self.process_source(input.to_path_buf(), source)?;

        let output = match output {
            Some(path) => path.to_path_buf(),
            None => output_path(input),
        };

        let file = fs::File::create(&output)?;
        pack::write(&document, file)?;

        Ok(output)
    }

    /// Segment, validate and compile one document. Validation runs before
    /// any toolchain call.
    pub fn process_source(
        &self,
        path: PathBuf,
        source: String,
    ) -> Result<ShaderDocument, Error> {
        let mut document = segment::segment(path, source, &self.macros, self.options)?;

        validate::validate_stage_set(document.stages())?;

        self.compiler.compile(&mut document)?;

        Ok(document)
    }
}

/// Expand the command line arguments into the list of shader files to
/// process: directories are walked recursively, everything else must carry
/// the `.shader` suffix.
pub fn discover_inputs(args: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();

    for arg in args {
        if arg.is_dir() {
            for entry in WalkDir::new(arg).sort_by_file_name() {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && has_shader_suffix(entry.path()) {
                            inputs.push(entry.into_path());
                        }
                    }
                    Err(err) => warn!("cannot walk {}: {err}", arg.display()),
                }
            }
        } else if has_shader_suffix(arg) {
            inputs.push(arg.clone());
        } else {
            warn!(
                "skipping {}: no {SHADER_SUFFIX} suffix",
                arg.display()
            );
        }
    }

    inputs
}

pub fn has_shader_suffix(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(split_shader_suffix)
        .is_some_and(|stem| !stem.is_empty())
}

/// Input path with the `.shader` suffix swapped for `.spirv`.
pub fn output_path(input: &Path) -> PathBuf {
    let raw = input.to_string_lossy();
    let stem = split_shader_suffix(&raw).unwrap_or(&raw);

    PathBuf::from(format!("{stem}{PACK_SUFFIX}"))
}

fn split_shader_suffix(name: &str) -> Option<&str> {
    let at = name.len().checked_sub(SHADER_SUFFIX.len())?;

    if !name.is_char_boundary(at) {
        return None;
    }

    let (stem, suffix) = name.split_at(at);

    suffix.eq_ignore_ascii_case(SHADER_SUFFIX).then_some(stem)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn output_path_swaps_the_suffix() {
        assert_eq!(
            output_path(Path::new("assets/pbr.shader")),
            PathBuf::from("assets/pbr.spirv")
        );
        assert_eq!(
            output_path(Path::new("assets/PBR.SHADER")),
            PathBuf::from("assets/PBR.spirv")
        );
    }

    #[test]
    fn shader_suffix_is_case_insensitive() {
        assert!(has_shader_suffix(Path::new("a.shader")));
        assert!(has_shader_suffix(Path::new("a.ShAdEr")));
        assert!(!has_shader_suffix(Path::new("a.glsl")));
        assert!(!has_shader_suffix(Path::new(".shader")));
    }

    #[test]
    fn discovery_walks_directories_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();

        fs::write(dir.path().join("a.shader"), "x").unwrap();
        fs::write(dir.path().join("ignored.glsl"), "x").unwrap();
        fs::write(nested.join("b.shader"), "x").unwrap();

        let inputs = discover_inputs(&[dir.path().to_path_buf()]);

        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().any(|p| p.ends_with("a.shader")));
        assert!(inputs.iter().any(|p| p.ends_with("b.shader")));
    }

    #[test]
    fn discovery_skips_files_without_the_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.glsl");
        fs::write(&other, "x").unwrap();

        assert!(discover_inputs(&[other]).is_empty());
    }
}
