use phf::{Map, phf_map};

// Colours are packed as 0xRRGGBB.

pub(super) static JMOL_COLORS: Map<&'static str, u32> = phf_map! {
    "H" => 0xFFFFFF, "He" => 0xD9FFFF,
    "Li" => 0xCC80FF, "Be" => 0xC2FF00, "B" => 0xFFB5B5, "C" => 0x909090, "N" => 0x3050F8,
    "O" => 0xFF0D0D, "F" => 0x90E050, "Ne" => 0xB3E3F5,
    "Na" => 0xAB5CF2, "Mg" => 0x8AFF00, "Al" => 0xBFA6A6, "Si" => 0xF0C8A0, "P" => 0xFF8000,
    "S" => 0xFFFF30, "Cl" => 0x1FF01F, "Ar" => 0x80D1E3,
    "K" => 0x8F40D4, "Ca" => 0x3DFF00, "Sc" => 0xE6E6E6, "Ti" => 0xBFC2C7, "V" => 0xA6A6AB,
    "Cr" => 0x8A99C7, "Mn" => 0x9C7AC7, "Fe" => 0xE06633, "Co" => 0xF090A0, "Ni" => 0x50D050,
    "Cu" => 0xC88033, "Zn" => 0x7D80B0, "Ga" => 0xC28F8F, "Ge" => 0x668F8F, "As" => 0xBD80E3,
    "Se" => 0xFFA100, "Br" => 0xA62929, "Kr" => 0x5CB8D1,
    "Rb" => 0x702EB0, "Sr" => 0x00FF00, "Y" => 0x94FFFF, "Zr" => 0x94E0E0, "Nb" => 0x73C2C9,
    "Mo" => 0x54B5B5, "Tc" => 0x3B9E9E, "Ru" => 0x248F8F, "Rh" => 0x0A7D8C, "Pd" => 0x006985,
    "Ag" => 0xC0C0C0, "Cd" => 0xFFD98F, "In" => 0xA67573, "Sn" => 0x668080, "Sb" => 0x9E63B5,
    "Te" => 0xD47A00, "I" => 0x940094, "Xe" => 0x429EB0,
    "Cs" => 0x57178F, "Ba" => 0x00C900, "La" => 0x70D4FF, "Ce" => 0xFFFFC7, "Pr" => 0xD9FFC7,
    "Nd" => 0xC7FFC7, "Pm" => 0xA3FFC7, "Sm" => 0x8FFFC7, "Eu" => 0x61FFC7, "Gd" => 0x45FFC7,
    "Tb" => 0x30FFC7, "Dy" => 0x1FFFC7, "Ho" => 0x00FF9C, "Er" => 0x00E675, "Tm" => 0x00D452,
    "Yb" => 0x00BF38, "Lu" => 0x00AB24, "Hf" => 0x4DC2FF, "Ta" => 0x4DA6FF, "W" => 0x2194D6,
    "Re" => 0x267DAB, "Os" => 0x266696, "Ir" => 0x175487, "Pt" => 0xD0D0E0, "Au" => 0xFFD123,
    "Hg" => 0xB8B8D0, "Tl" => 0xA6544D, "Pb" => 0x575961, "Bi" => 0x9E4FB5, "Po" => 0xAB5C00,
    "At" => 0x754F45, "Rn" => 0x428296,
    "Fr" => 0x420066, "Ra" => 0x007D00, "Ac" => 0x70ABFA, "Th" => 0x00BAFF, "Pa" => 0x00A1FF,
    "U" => 0x008FFF, "Np" => 0x0080FF, "Pu" => 0x006BFF, "Am" => 0x545CF2, "Cm" => 0x785CE3,
};

/// Classic CPK colouring, used for the "ASE" style.
pub(super) static CPK_COLORS: Map<&'static str, u32> = phf_map! {
    "H" => 0xFFFFFF, "He" => 0xFFC0CB, "Li" => 0xB22222, "B" => 0x00FF00, "C" => 0xC8C8C8,
    "N" => 0x8F8FFF, "O" => 0xF00000, "F" => 0xDAA520, "Na" => 0x0000FF, "Mg" => 0x228B22,
    "Al" => 0x808090, "Si" => 0xDAA520, "P" => 0xFFA500, "S" => 0xFFC832, "Cl" => 0x00FF00,
    "Ca" => 0x808090, "Ti" => 0x808090, "Cr" => 0x808090, "Mn" => 0x808090, "Fe" => 0xFFA500,
    "Ni" => 0xA52A2A, "Cu" => 0xA52A2A, "Zn" => 0xA52A2A, "Br" => 0xA52A2A, "Ag" => 0x808090,
    "I" => 0xA020F0, "Ba" => 0xFFA500, "Au" => 0xDAA520,
};

pub(super) static VESTA_COLORS: Map<&'static str, u32> = phf_map! {
    "H" => 0xFFCCCC, "He" => 0xFCE8CE, "Li" => 0x86DF73, "Be" => 0x5ED77B, "B" => 0x1FA20F,
    "C" => 0x814929, "N" => 0xB0B9E6, "O" => 0xFE0300, "F" => 0xB0B9E6, "Ne" => 0xFE37B5,
    "Na" => 0xF9DC3C, "Mg" => 0xFB7B15, "Al" => 0x81B2D6, "Si" => 0x1B3BFA, "P" => 0xC09CC2,
    "S" => 0xFFFA00, "Cl" => 0x31FC02, "Ar" => 0xCFFEC4, "K" => 0xA121F6, "Ca" => 0x5A96BD,
    "Ti" => 0x78CAFF, "V" => 0xE51900, "Cr" => 0x00009E, "Mn" => 0xA8089E, "Fe" => 0xB57100,
    "Co" => 0x0000AF, "Ni" => 0xB7BBBD, "Cu" => 0x2247DC, "Zn" => 0x8F8F81, "Ga" => 0x9EE373,
    "Ge" => 0x7E6EA6, "As" => 0x74D057, "Se" => 0x9AEF0F, "Br" => 0x7E3102, "Sr" => 0x00FF27,
    "Zr" => 0x00FF00, "Mo" => 0xB386AF, "Ag" => 0xBEBEBE, "Sn" => 0x9A8EB9, "I" => 0x8E1F8A,
    "Ba" => 0x1FEF00, "La" => 0x5AC449, "Pt" => 0xCBC3D0, "Au" => 0xFEB238, "Pb" => 0x52525A,
};
