use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a client run. Field-level extraction gaps never
/// surface here; they resolve to defaults inside the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no {module} source file matches client '{client}' in {}", .dir.display())]
    NotFound {
        client: String,
        module: String,
        dir: PathBuf,
    },

    #[error("required artifact is missing or has no text: {}", .path.display())]
    StructuralFailure { path: PathBuf },

    #[error("unknown parser module '{0}'")]
    UnknownModule(String),
}
