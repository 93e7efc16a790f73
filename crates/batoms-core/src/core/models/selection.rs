use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Mask has {found} entries but the collection has {expected} sites")]
    MaskLength { expected: usize, found: usize },
    #[error("Index {index} is out of range for {len} sites")]
    OutOfRange { index: usize, len: usize },
}

/// Sites addressed either by a boolean mask or by explicit indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSelection {
    Mask(Vec<bool>),
    Indices(Vec<usize>),
}

impl IndexSelection {
    /// Resolves the selection against a collection of `len` sites.
    ///
    /// The result is sorted and free of duplicates.
    pub fn resolve(&self, len: usize) -> Result<Vec<usize>, SelectionError> {
        match self {
            IndexSelection::Mask(mask) => {
                if mask.len() != len {
                    return Err(SelectionError::MaskLength {
                        expected: len,
                        found: mask.len(),
                    });
                }
                Ok(mask
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &selected)| selected.then_some(i))
                    .collect())
            }
            IndexSelection::Indices(indices) => {
                if let Some(&index) = indices.iter().find(|&&i| i >= len) {
                    return Err(SelectionError::OutOfRange { index, len });
                }
                let mut resolved = indices.clone();
                resolved.sort_unstable();
                resolved.dedup();
                Ok(resolved)
            }
        }
    }
}

impl From<Vec<usize>> for IndexSelection {
    fn from(indices: Vec<usize>) -> Self {
        IndexSelection::Indices(indices)
    }
}

impl From<&[usize]> for IndexSelection {
    fn from(indices: &[usize]) -> Self {
        IndexSelection::Indices(indices.to_vec())
    }
}

impl From<Vec<bool>> for IndexSelection {
    fn from(mask: Vec<bool>) -> Self {
        IndexSelection::Mask(mask)
    }
}
