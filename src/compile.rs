use shaderc::{
    CompileOptions, Compiler, EnvVersion, OptimizationLevel, ShaderKind, SpirvVersion, TargetEnv,
};
use tracing::warn;

use crate::segment::ENTRY_POINT;
use crate::shader::{ShaderDocument, ShaderStage};

#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("shader toolchain unavailable")]
    Init,

    #[error("preprocessing failed for {stage} stage:\n{log}")]
    Preprocess { stage: ShaderStage, log: String },

    #[error("GLSL error in {stage} stage:\n{log}")]
    Glsl { stage: ShaderStage, log: String },

    #[error("shader toolchain error: {0}")]
    Toolchain(#[from] shaderc::Error),
}

/// Fixed toolchain configuration applied to every compile call.
#[derive(Debug, Clone, Copy)]
pub struct CompileConfig {
    pub target_env: TargetEnv,
    pub env_version: EnvVersion,
    pub spirv_version: SpirvVersion,
    pub optimization: OptimizationLevel,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            target_env: TargetEnv::Vulkan,
            env_version: EnvVersion::Vulkan1_2,
            spirv_version: SpirvVersion::V1_5,
            optimization: OptimizationLevel::Zero,
        }
    }
}

/// Owns the GLSL to SPIR-V toolchain. Constructed once per run by the
/// driver; a construction failure aborts the run and is never retried.
pub struct ShaderCompiler {
    compiler: Compiler,
    config: CompileConfig,
}

impl ShaderCompiler {
    pub fn new() -> Result<Self, CompileError> {
        Self::with_config(CompileConfig::default())
    }

    pub fn with_config(config: CompileConfig) -> Result<Self, CompileError> {
        let compiler = Compiler::new().ok_or(CompileError::Init)?;

        Ok(Self { compiler, config })
    }

    /// Compile every populated stage of a segmented document into SPIR-V.
    /// Stages are compiled in slot order; the first failure abandons the
    /// document.
    pub fn compile(&self, document: &mut ShaderDocument) -> Result<(), CompileError> {
        for stage in ShaderStage::ALL {
            if document.slot(stage).source().is_empty() {
                continue;
            }

            let spirv = self.compile_stage(document, stage)?;
            document.set_spirv(stage, spirv);
        }

        Ok(())
    }

    fn compile_stage(
        &self,
        document: &ShaderDocument,
        stage: ShaderStage,
    ) -> Result<Vec<u32>, CompileError> {
        let source = document.slot(stage).source();
        let unit_name = format!("{}[{}]", document.path().display(), stage);
        let options = self.options()?;

        let expanded = self
            .compiler
            .preprocess(source, &unit_name, ENTRY_POINT, Some(&options))
            .map_err(|err| match err {
                shaderc::Error::CompilationError(_, log) => {
                    CompileError::Preprocess { stage, log }
                }
                err => CompileError::Toolchain(err),
            })?;

        let artifact = self
            .compiler
            .compile_into_spirv(
                &expanded.as_text(),
                shader_kind(stage),
                &unit_name,
                ENTRY_POINT,
                Some(&options),
            )
            .map_err(|err| match err {
                shaderc::Error::CompilationError(_, log) => CompileError::Glsl { stage, log },
                err => CompileError::Toolchain(err),
            })?;

        if artifact.get_num_warnings() > 0 {
            warn!(stage = %stage, "{}", artifact.get_warning_messages().trim_end());
        }

        Ok(artifact.as_binary().to_vec())
    }

    fn options(&self) -> Result<CompileOptions<'_>, CompileError> {
        let mut options = CompileOptions::new().ok_or(CompileError::Init)?;

        options.set_target_env(self.config.target_env, self.config.env_version as u32);
        options.set_target_spirv(self.config.spirv_version);
        options.set_optimization_level(self.config.optimization);

        Ok(options)
    }
}

fn shader_kind(stage: ShaderStage) -> ShaderKind {
    match stage {
        ShaderStage::Vertex => ShaderKind::Vertex,
        ShaderStage::TessellationControl => ShaderKind::TessControl,
        ShaderStage::TessellationEvaluation => ShaderKind::TessEvaluation,
        ShaderStage::Geometry => ShaderKind::Geometry,
        ShaderStage::Fragment => ShaderKind::Fragment,
        ShaderStage::Compute => ShaderKind::Compute,
    }
}
