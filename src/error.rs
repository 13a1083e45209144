//! Error types for variant synthesis.

use thiserror::Error;

use crate::combiner::VariantKey;
use crate::renderer::utils::numbered_source;

/// The compiler rejected an emitted program.
#[derive(Debug, Clone, Error)]
#[error("{program_name} ({entry_point}) failed to compile:\n{diagnostic}\n\nGenerated WGSL:\n{}", numbered_source(.emitted_source))]
pub struct ProgramCompilationError {
    pub program_name: String,
    pub entry_point: String,
    pub emitted_source: String,
    pub diagnostic: String,
}

#[derive(Debug, Clone, Error)]
pub enum SynthError {
    #[error(transparent)]
    ProgramCompilation(#[from] ProgramCompilationError),

    #[error("variant {}: {reason}", .key.base_name())]
    UnsupportedCombinerFlagCombination { key: VariantKey, reason: String },
}

pub type SynthResult<T> = Result<T, SynthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_error_prints_numbered_source() {
        let err = ProgramCompilationError {
            program_name: "combiner_00000000_s1_n0_p0_shadow".to_string(),
            entry_point: "shadow_any_hit".to_string(),
            emitted_source: "fn broken(".to_string(),
            diagnostic: "expected parameter".to_string(),
        };
        let text = err.to_string();
        assert!(
            text.starts_with("combiner_00000000_s1_n0_p0_shadow (shadow_any_hit) failed to compile")
        );
        assert!(text.contains("expected parameter"));
        assert!(text.contains("   1 | fn broken("));
    }
}
