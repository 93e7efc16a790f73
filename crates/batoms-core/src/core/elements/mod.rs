//! # Elements Module
//!
//! Static per-element data used to size and colour species instances: covalent,
//! van der Waals and ionic radii, and the JMOL, ASE (CPK) and VESTA colour schemes.
//!
//! Only the covalent radius and JMOL colour tables are complete. Lookups in the other
//! tables fall back to those two and log a warning when an element is missing.

mod colors;
mod radii;

use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Symbol of the synthetic element representing the unoccupied fraction of a site.
pub const VACANCY_SYMBOL: &str = "X";

/// An RGBA colour with components in `[0, 1]`.
pub type Rgba = [f64; 4];

const VACANCY_COLOR: Rgba = [0.9, 0.9, 0.9, 1.0];

/// Radius table used to size a species instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RadiusStyle {
    #[default]
    Covalent,
    VanDerWaals,
    Ionic,
}

/// Colour scheme used for per-element materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorStyle {
    #[default]
    Jmol,
    Ase,
    Vesta,
}

impl FromStr for RadiusStyle {
    type Err = ();

    /// Parses a radius style name, case-insensitively.
    ///
    /// Accepts `"covalent"`, `"vdw"`, `"van-der-waals"`, `"ionic"` and the numeric
    /// aliases `"0"`, `"1"`, `"2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "covalent" | "0" => Ok(RadiusStyle::Covalent),
            "vdw" | "van-der-waals" | "van_der_waals" | "vanderwaals" | "1" => {
                Ok(RadiusStyle::VanDerWaals)
            }
            "ionic" | "2" => Ok(RadiusStyle::Ionic),
            _ => Err(()),
        }
    }
}

impl FromStr for ColorStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jmol" | "0" => Ok(ColorStyle::Jmol),
            "ase" | "cpk" | "1" => Ok(ColorStyle::Ase),
            "vesta" | "2" => Ok(ColorStyle::Vesta),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RadiusStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadiusStyle::Covalent => "covalent",
            RadiusStyle::VanDerWaals => "vdw",
            RadiusStyle::Ionic => "ionic",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ColorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorStyle::Jmol => "JMOL",
            ColorStyle::Ase => "ASE",
            ColorStyle::Vesta => "VESTA",
        };
        f.write_str(name)
    }
}

/// Returns `true` if `symbol` is a chemical element known to the tables.
///
/// The vacancy filler is not an element and returns `false`.
pub fn is_known_element(symbol: &str) -> bool {
    radii::COVALENT_RADII.contains_key(symbol)
}

/// Looks up the radius of an element in Angstroms.
///
/// Returns `None` for unknown symbols (including the vacancy filler).
pub fn radius(symbol: &str, style: RadiusStyle) -> Option<f64> {
    let covalent = radii::COVALENT_RADII.get(symbol).copied()?;
    let table = match style {
        RadiusStyle::Covalent => return Some(covalent),
        RadiusStyle::VanDerWaals => &radii::VDW_RADII,
        RadiusStyle::Ionic => &radii::IONIC_RADII,
    };
    match table.get(symbol) {
        Some(&value) => Some(value),
        None => {
            warn!(
                "No {} radius tabulated for '{}', falling back to the covalent radius.",
                style, symbol
            );
            Some(covalent)
        }
    }
}

/// Looks up the base colour of an element.
///
/// The vacancy filler always has a fixed neutral colour. Returns `None` for unknown
/// symbols.
pub fn color(symbol: &str, style: ColorStyle) -> Option<Rgba> {
    if symbol == VACANCY_SYMBOL {
        return Some(VACANCY_COLOR);
    }
    let jmol = colors::JMOL_COLORS.get(symbol).copied()?;
    let table = match style {
        ColorStyle::Jmol => return Some(unpack(jmol)),
        ColorStyle::Ase => &colors::CPK_COLORS,
        ColorStyle::Vesta => &colors::VESTA_COLORS,
    };
    match table.get(symbol) {
        Some(&packed) => Some(unpack(packed)),
        None => {
            warn!(
                "No {} colour tabulated for '{}', falling back to JMOL.",
                style, symbol
            );
            Some(unpack(jmol))
        }
    }
}

fn unpack(packed: u32) -> Rgba {
    let channel = |shift: u32| ((packed >> shift) & 0xFF) as f64 / 255.0;
    [channel(16), channel(8), channel(0), 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_styles_parse_with_aliases() {
        assert_eq!(RadiusStyle::from_str("covalent"), Ok(RadiusStyle::Covalent));
        assert_eq!(RadiusStyle::from_str("VDW"), Ok(RadiusStyle::VanDerWaals));
        assert_eq!(
            RadiusStyle::from_str("van-der-waals"),
            Ok(RadiusStyle::VanDerWaals)
        );
        assert_eq!(RadiusStyle::from_str("2"), Ok(RadiusStyle::Ionic));
        assert_eq!(RadiusStyle::from_str("metallic"), Err(()));
    }

    #[test]
    fn color_styles_parse_case_insensitively() {
        assert_eq!(ColorStyle::from_str("jmol"), Ok(ColorStyle::Jmol));
        assert_eq!(ColorStyle::from_str("Ase"), Ok(ColorStyle::Ase));
        assert_eq!(ColorStyle::from_str("VESTA"), Ok(ColorStyle::Vesta));
        assert_eq!(ColorStyle::from_str("rasmol"), Err(()));
    }

    #[test]
    fn covalent_radius_is_looked_up_directly() {
        assert_eq!(radius("C", RadiusStyle::Covalent), Some(0.76));
        assert_eq!(radius("Fe", RadiusStyle::Covalent), Some(1.32));
    }

    #[test]
    fn missing_vdw_radius_falls_back_to_covalent() {
        assert_eq!(radius("O", RadiusStyle::VanDerWaals), Some(1.52));
        // Tungsten has no tabulated vdW radius.
        assert_eq!(radius("W", RadiusStyle::VanDerWaals), Some(1.62));
    }

    #[test]
    fn unknown_symbols_have_no_radius_or_colour() {
        assert_eq!(radius("Qq", RadiusStyle::Covalent), None);
        assert_eq!(radius(VACANCY_SYMBOL, RadiusStyle::Covalent), None);
        assert_eq!(color("Qq", ColorStyle::Jmol), None);
        assert!(!is_known_element(VACANCY_SYMBOL));
        assert!(is_known_element("Si"));
    }

    #[test]
    fn colours_are_unpacked_to_unit_rgba() {
        assert_eq!(color("H", ColorStyle::Jmol), Some([1.0, 1.0, 1.0, 1.0]));
        let oxygen = color("O", ColorStyle::Jmol).unwrap();
        assert_eq!(oxygen[0], 1.0);
        assert!((oxygen[1] - 13.0 / 255.0).abs() < 1e-12);
        assert_eq!(oxygen[3], 1.0);
    }

    #[test]
    fn vacancy_has_a_fixed_colour_in_every_style() {
        for style in [ColorStyle::Jmol, ColorStyle::Ase, ColorStyle::Vesta] {
            assert_eq!(color(VACANCY_SYMBOL, style), Some(VACANCY_COLOR));
        }
    }

    #[test]
    fn missing_vesta_colour_falls_back_to_jmol() {
        assert_eq!(color("Xe", ColorStyle::Vesta), color("Xe", ColorStyle::Jmol));
    }
}
