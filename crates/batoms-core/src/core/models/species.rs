use crate::core::elements::{ColorStyle, RadiusStyle, VACANCY_SYMBOL};
use thiserror::Error;

/// Occupancy totals within this distance of 1.0 count as fully occupied.
pub const OCCUPANCY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompositionError {
    #[error("Total occupancy {total} exceeds 1")]
    OverOccupancy { total: f64 },
    #[error("Occupancy of '{element}' is negative ({occupancy})")]
    NegativeOccupancy { element: String, occupancy: f64 },
    #[error("Occupancy of '{element}' is not a finite number")]
    NonFiniteOccupancy { element: String },
    #[error("Element '{0}' is listed more than once")]
    DuplicateElement(String),
    #[error("Species '{label}' has no element other than the vacancy filler")]
    EmptySpecies { label: String },
}

/// The element content of a species, either a single element or a fractional mix.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementComposition {
    Pure(String),
    Fractional(Vec<(String, f64)>),
}

impl ElementComposition {
    /// The pure composition implied by a species label.
    ///
    /// Everything after the first `_` names a sub-species, so `"Fe_up"` is pure `"Fe"`.
    pub fn from_label(label: &str) -> Self {
        let symbol = label.split('_').next().unwrap_or(label);
        ElementComposition::Pure(symbol.to_string())
    }

    pub fn fractional<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        ElementComposition::Fractional(
            entries
                .into_iter()
                .map(|(element, occupancy)| (element.into(), occupancy))
                .collect(),
        )
    }
}

impl From<&str> for ElementComposition {
    fn from(symbol: &str) -> Self {
        ElementComposition::Pure(symbol.to_string())
    }
}

/// Validated element occupancies of a species, in definition order.
///
/// The occupancies always sum to 1 within [`OCCUPANCY_TOLERANCE`]: an under-occupied
/// composition gets the vacancy filler appended (or topped up, if listed explicitly).
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyTable {
    entries: Vec<(String, f64)>,
}

impl OccupancyTable {
    pub fn new(composition: &ElementComposition) -> Result<Self, CompositionError> {
        let mut entries: Vec<(String, f64)> = match composition {
            ElementComposition::Pure(symbol) => vec![(symbol.clone(), 1.0)],
            ElementComposition::Fractional(entries) => {
                let mut checked: Vec<(String, f64)> = Vec::with_capacity(entries.len() + 1);
                for (element, occupancy) in entries {
                    if !occupancy.is_finite() {
                        return Err(CompositionError::NonFiniteOccupancy {
                            element: element.clone(),
                        });
                    }
                    if *occupancy < 0.0 {
                        return Err(CompositionError::NegativeOccupancy {
                            element: element.clone(),
                            occupancy: *occupancy,
                        });
                    }
                    if checked.iter().any(|(e, _)| e == element) {
                        return Err(CompositionError::DuplicateElement(element.clone()));
                    }
                    checked.push((element.clone(), *occupancy));
                }
                checked
            }
        };

        let total: f64 = entries.iter().map(|(_, o)| o).sum();
        if total > 1.0 + OCCUPANCY_TOLERANCE {
            return Err(CompositionError::OverOccupancy { total });
        }
        if total < 1.0 - OCCUPANCY_TOLERANCE {
            let deficit = 1.0 - total;
            match entries.iter_mut().find(|(e, _)| e == VACANCY_SYMBOL) {
                Some((_, vacancy)) => *vacancy += deficit,
                None => entries.push((VACANCY_SYMBOL.to_string(), deficit)),
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(e, _)| e.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn occupancy(&self, element: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(e, _)| e == element)
            .map(|(_, o)| *o)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, o)| o).sum()
    }

    /// Occupancy of the vacancy filler, zero for a fully occupied site.
    pub fn vacancy(&self) -> f64 {
        self.occupancy(VACANCY_SYMBOL).unwrap_or(0.0)
    }

    /// Entries ordered by descending occupancy; ties keep definition order.
    pub fn sorted(&self) -> Vec<(&str, f64)> {
        let mut sorted: Vec<(&str, f64)> =
            self.entries.iter().map(|(e, o)| (e.as_str(), *o)).collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted
    }

    /// The element with the highest occupancy, ignoring the vacancy filler.
    pub fn main_element(&self) -> Option<&str> {
        self.sorted()
            .into_iter()
            .map(|(e, _)| e)
            .find(|&e| e != VACANCY_SYMBOL)
    }

    /// Same elements with occupancies equal within [`OCCUPANCY_TOLERANCE`], in any order.
    pub fn is_equivalent(&self, other: &OccupancyTable) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(element, occupancy)| {
                other
                    .occupancy(element)
                    .is_some_and(|o| (o - occupancy).abs() <= OCCUPANCY_TOLERANCE)
            })
    }
}

/// A named composition of elements sharing one render instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub label: String,
    pub occupancies: OccupancyTable,
    pub radius_style: RadiusStyle,
    pub color_style: ColorStyle,
}

impl Species {
    pub fn new(
        label: &str,
        composition: &ElementComposition,
        radius_style: RadiusStyle,
        color_style: ColorStyle,
    ) -> Result<Self, CompositionError> {
        Ok(Self {
            label: label.to_string(),
            occupancies: OccupancyTable::new(composition)?,
            radius_style,
            color_style,
        })
    }

    pub fn main_element(&self) -> Result<&str, CompositionError> {
        self.occupancies
            .main_element()
            .ok_or_else(|| CompositionError::EmptySpecies {
                label: self.label.clone(),
            })
    }

    pub fn is_fractional(&self) -> bool {
        self.occupancies.len() > 1
    }
}
