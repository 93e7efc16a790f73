use super::backend::BackendError;
use crate::core::geometry::lattice::LatticeError;
use crate::core::models::selection::SelectionError;
use crate::core::models::species::CompositionError;
use thiserror::Error;

/// Broad class of an [`EngineError`], deciding how a caller should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; nothing was changed.
    Validation,
    /// The operation would leave dangling or clashing references.
    ReferentialIntegrity,
    /// The request names a shape, style or lattice setup that cannot be built.
    UnsupportedConfiguration,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid composition: {0}")]
    Composition(#[from] CompositionError),

    #[error("Expected {expected} positions but got {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Cannot repeat {multiplicity} times along undefined lattice vector {axis}")]
    UndefinedLattice { axis: usize, multiplicity: usize },

    #[error("Multiplicity along lattice vector {axis} must be at least 1")]
    ZeroMultiplicity { axis: usize },

    #[error("Repeating {multiplicities:?} times would create too many sites")]
    TooManyReplicas { multiplicities: [usize; 3] },

    #[error("Cell is singular")]
    SingularCell,

    #[error("Species '{label}' is still used by {sites} site(s)")]
    SpeciesInUse { label: String, sites: usize },

    #[error("Species '{0}' is not defined")]
    UnknownSpecies(String),

    #[error("Unknown element '{element}' in species '{label}'")]
    UnknownElement { label: String, element: String },

    #[error("Species '{0}' is already defined with a different composition")]
    SpeciesConflict(String),

    #[error("Index {index} is out of range for {len} sites")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Mask has {found} entries but the collection has {expected} sites")]
    MaskLengthMismatch { expected: usize, found: usize },

    #[error("Frame {index} is out of range for {count} frame(s)")]
    FrameOutOfRange { index: usize, count: usize },

    #[error("Placement is not invertible: {0}")]
    InvalidPlacement(String),

    #[error("Unsupported instance shape: {0}")]
    UnknownShape(String),

    #[error("Unknown {kind} style '{name}'")]
    UnknownStyle { kind: &'static str, name: String },

    #[error("Attribute '{name}': {reason}")]
    AttributeMismatch { name: String, reason: String },

    #[error("Invalid structure description: {0}")]
    InvalidStructure(String),

    #[error("Scene backend error: {0}")]
    Backend(#[from] BackendError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::SpeciesInUse { .. }
            | EngineError::UnknownSpecies(_)
            | EngineError::SpeciesConflict(_)
            | EngineError::Backend(BackendError::ObjectExists(_)) => {
                ErrorKind::ReferentialIntegrity
            }
            EngineError::UndefinedLattice { .. }
            | EngineError::ZeroMultiplicity { .. }
            | EngineError::TooManyReplicas { .. }
            | EngineError::SingularCell
            | EngineError::UnknownShape(_)
            | EngineError::UnknownStyle { .. } => ErrorKind::UnsupportedConfiguration,
            EngineError::Composition(_)
            | EngineError::ShapeMismatch { .. }
            | EngineError::UnknownElement { .. }
            | EngineError::IndexOutOfRange { .. }
            | EngineError::MaskLengthMismatch { .. }
            | EngineError::FrameOutOfRange { .. }
            | EngineError::InvalidPlacement(_)
            | EngineError::AttributeMismatch { .. }
            | EngineError::InvalidStructure(_)
            | EngineError::Backend(_) => ErrorKind::Validation,
        }
    }
}

impl From<LatticeError> for EngineError {
    fn from(e: LatticeError) -> Self {
        match e {
            LatticeError::UndefinedLattice { axis, multiplicity } => {
                EngineError::UndefinedLattice { axis, multiplicity }
            }
            LatticeError::ZeroMultiplicity { axis } => EngineError::ZeroMultiplicity { axis },
            LatticeError::TooManyReplicas { multiplicities } => {
                EngineError::TooManyReplicas { multiplicities }
            }
            LatticeError::Singular => EngineError::SingularCell,
        }
    }
}

impl From<SelectionError> for EngineError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::MaskLength { expected, found } => {
                EngineError::MaskLengthMismatch { expected, found }
            }
            SelectionError::OutOfRange { index, len } => {
                EngineError::IndexOutOfRange { index, len }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_classified_into_the_taxonomy() {
        assert_eq!(
            EngineError::from(CompositionError::OverOccupancy { total: 1.2 }).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::ShapeMismatch {
                expected: 2,
                found: 3
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::SpeciesInUse {
                label: "O".to_string(),
                sites: 1
            }
            .kind(),
            ErrorKind::ReferentialIntegrity
        );
        assert_eq!(
            EngineError::UnknownShape("torus".to_string()).kind(),
            ErrorKind::UnsupportedConfiguration
        );
    }

    #[test]
    fn duplicate_scene_objects_are_referential_errors() {
        let e = EngineError::from(BackendError::ObjectExists("h2o".to_string()));
        assert_eq!(e.kind(), ErrorKind::ReferentialIntegrity);
        let e = EngineError::from(BackendError::ObjectNotFound("h2o".to_string()));
        assert_eq!(e.kind(), ErrorKind::Validation);
    }

    #[test]
    fn lattice_errors_convert_to_unsupported_configuration() {
        let e = EngineError::from(LatticeError::UndefinedLattice {
            axis: 2,
            multiplicity: 3,
        });
        assert_eq!(
            e,
            EngineError::UndefinedLattice {
                axis: 2,
                multiplicity: 3
            }
        );
        assert_eq!(e.kind(), ErrorKind::UnsupportedConfiguration);
    }

    #[test]
    fn oversized_repeats_are_unsupported() {
        let e = EngineError::from(LatticeError::TooManyReplicas {
            multiplicities: [1 << 33, 1 << 33, 1],
        });
        assert!(matches!(e, EngineError::TooManyReplicas { .. }));
        assert_eq!(e.kind(), ErrorKind::UnsupportedConfiguration);
    }

    #[test]
    fn selection_errors_convert_to_validation_errors() {
        let e = EngineError::from(SelectionError::MaskLength {
            expected: 3,
            found: 2,
        });
        assert!(matches!(e, EngineError::MaskLengthMismatch { .. }));
        assert_eq!(e.kind(), ErrorKind::Validation);
    }
}
