use phf::{Map, phf_map};

/// Covalent radii in Angstroms (Cordero et al., Dalton Trans. 2008).
pub(super) static COVALENT_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 0.31, "He" => 0.28,
    "Li" => 1.28, "Be" => 0.96, "B" => 0.84, "C" => 0.76, "N" => 0.71, "O" => 0.66, "F" => 0.57, "Ne" => 0.58,
    "Na" => 1.66, "Mg" => 1.41, "Al" => 1.21, "Si" => 1.11, "P" => 1.07, "S" => 1.05, "Cl" => 1.02, "Ar" => 1.06,
    "K" => 2.03, "Ca" => 1.76, "Sc" => 1.70, "Ti" => 1.60, "V" => 1.53, "Cr" => 1.39, "Mn" => 1.39,
    "Fe" => 1.32, "Co" => 1.26, "Ni" => 1.24, "Cu" => 1.32, "Zn" => 1.22, "Ga" => 1.22, "Ge" => 1.20,
    "As" => 1.19, "Se" => 1.20, "Br" => 1.20, "Kr" => 1.16,
    "Rb" => 2.20, "Sr" => 1.95, "Y" => 1.90, "Zr" => 1.75, "Nb" => 1.64, "Mo" => 1.54, "Tc" => 1.47,
    "Ru" => 1.46, "Rh" => 1.42, "Pd" => 1.39, "Ag" => 1.45, "Cd" => 1.44, "In" => 1.42, "Sn" => 1.39,
    "Sb" => 1.39, "Te" => 1.38, "I" => 1.39, "Xe" => 1.40,
    "Cs" => 2.44, "Ba" => 2.15, "La" => 2.07, "Ce" => 2.04, "Pr" => 2.03, "Nd" => 2.01, "Pm" => 1.99,
    "Sm" => 1.98, "Eu" => 1.98, "Gd" => 1.96, "Tb" => 1.94, "Dy" => 1.92, "Ho" => 1.92, "Er" => 1.89,
    "Tm" => 1.90, "Yb" => 1.87, "Lu" => 1.87, "Hf" => 1.75, "Ta" => 1.70, "W" => 1.62, "Re" => 1.51,
    "Os" => 1.44, "Ir" => 1.41, "Pt" => 1.36, "Au" => 1.36, "Hg" => 1.32, "Tl" => 1.45, "Pb" => 1.46,
    "Bi" => 1.48, "Po" => 1.40, "At" => 1.50, "Rn" => 1.50,
    "Fr" => 2.60, "Ra" => 2.21, "Ac" => 2.15, "Th" => 2.06, "Pa" => 2.00, "U" => 1.96, "Np" => 1.90,
    "Pu" => 1.87, "Am" => 1.80, "Cm" => 1.69,
};

/// Van der Waals radii in Angstroms (Bondi, completed with Mantina and Alvarez values).
pub(super) static VDW_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 1.20, "He" => 1.40,
    "Li" => 1.82, "Be" => 1.53, "B" => 1.92, "C" => 1.70, "N" => 1.55, "O" => 1.52, "F" => 1.47, "Ne" => 1.54,
    "Na" => 2.27, "Mg" => 1.73, "Al" => 1.84, "Si" => 2.10, "P" => 1.80, "S" => 1.80, "Cl" => 1.75, "Ar" => 1.88,
    "K" => 2.75, "Ca" => 2.31, "Sc" => 2.15, "Ti" => 2.11, "V" => 2.07, "Cr" => 2.06, "Mn" => 2.05,
    "Fe" => 2.04, "Co" => 2.00, "Ni" => 1.63, "Cu" => 1.40, "Zn" => 1.39, "Ga" => 1.87, "Ge" => 2.11,
    "As" => 1.85, "Se" => 1.90, "Br" => 1.85, "Kr" => 2.02,
    "Rb" => 3.03, "Sr" => 2.49, "Pd" => 1.63, "Ag" => 1.72, "Cd" => 1.58, "In" => 1.93, "Sn" => 2.17,
    "Sb" => 2.06, "Te" => 2.06, "I" => 1.98, "Xe" => 2.16,
    "Cs" => 3.43, "Ba" => 2.68, "Pt" => 1.75, "Au" => 1.66, "Hg" => 1.55, "Tl" => 1.96, "Pb" => 2.02,
    "Bi" => 2.07, "Po" => 1.97, "At" => 2.02, "Rn" => 2.20,
    "Fr" => 3.48, "Ra" => 2.83, "U" => 1.86,
};

/// Ionic radii in Angstroms (Shannon, six-fold coordination, most common oxidation state).
pub(super) static IONIC_RADII: Map<&'static str, f64> = phf_map! {
    "Li" => 0.76, "Be" => 0.45, "B" => 0.27, "C" => 0.16, "N" => 1.46, "O" => 1.40, "F" => 1.33,
    "Na" => 1.02, "Mg" => 0.72, "Al" => 0.535, "Si" => 0.40, "P" => 0.38, "S" => 1.84, "Cl" => 1.81,
    "K" => 1.38, "Ca" => 1.00, "Sc" => 0.745, "Ti" => 0.605, "V" => 0.54, "Cr" => 0.615, "Mn" => 0.83,
    "Fe" => 0.78, "Co" => 0.745, "Ni" => 0.69, "Cu" => 0.73, "Zn" => 0.74, "Ga" => 0.62, "Ge" => 0.53,
    "As" => 0.58, "Se" => 1.98, "Br" => 1.96,
    "Rb" => 1.52, "Sr" => 1.18, "Y" => 0.90, "Zr" => 0.72, "Nb" => 0.64, "Mo" => 0.59, "Ru" => 0.62,
    "Rh" => 0.665, "Pd" => 0.86, "Ag" => 1.15, "Cd" => 0.95, "In" => 0.80, "Sn" => 0.69, "Sb" => 0.76,
    "Te" => 2.21, "I" => 2.20,
    "Cs" => 1.67, "Ba" => 1.35, "La" => 1.032, "Ce" => 1.01, "Hf" => 0.71, "Ta" => 0.64, "W" => 0.60,
    "Pt" => 0.625, "Au" => 1.37, "Hg" => 1.02, "Tl" => 1.50, "Pb" => 1.19, "Bi" => 1.03, "U" => 0.89,
};
