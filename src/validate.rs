use crate::shader::StageSet;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidateError {
    #[error("no shader stage found")]
    NoStage,

    #[error("rasterizer stages combined with compute")]
    ComputeWithRaster,

    #[error("vertex stage without required fragment stage")]
    VertexWithoutFragment,
}

/// Check that a document's declared stages form a legal combination. Runs
/// once per document, before any toolchain work.
pub fn validate_stage_set(stages: StageSet) -> Result<(), ValidateError> {
    if stages.is_empty() {
        return Err(ValidateError::NoStage);
    }

    if stages.contains(StageSet::COMPUTE) && stages.intersects(StageSet::ALL_GRAPHICS) {
        return Err(ValidateError::ComputeWithRaster);
    }

    if stages.contains(StageSet::VERTEX) && !stages.contains(StageSet::FRAGMENT) {
        return Err(ValidateError::VertexWithoutFragment);
    }

    Ok(())
}
