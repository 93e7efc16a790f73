use batoms::core::io::structure::StructureLoadError;
use batoms::engine::error::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] EngineError),

    #[error(transparent)]
    Structure(#[from] StructureLoadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
