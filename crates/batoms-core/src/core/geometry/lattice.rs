use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

/// Upper bound on the number of replicas a single repeat may produce.
pub const MAX_REPLICAS: usize = 1 << 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LatticeError {
    #[error("Cannot repeat {multiplicity} times along undefined lattice vector {axis}")]
    UndefinedLattice { axis: usize, multiplicity: usize },
    #[error("Multiplicity along lattice vector {axis} must be at least 1")]
    ZeroMultiplicity { axis: usize },
    #[error("Repeating {multiplicities:?} times exceeds the limit of {} replicas", MAX_REPLICAS)]
    TooManyReplicas { multiplicities: [usize; 3] },
    #[error("Cell is singular and has no fractional coordinates")]
    Singular,
}

/// A unit cell whose matrix rows are the lattice vectors `a`, `b`, `c`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    matrix: Matrix3<f64>,
}

impl Cell {
    pub fn new(rows: [[f64; 3]; 3]) -> Self {
        Self {
            matrix: Matrix3::from_row_slice(&[
                rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2],
                rows[2][0], rows[2][1], rows[2][2],
            ]),
        }
    }

    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    /// An orthorhombic cell with the given edge lengths.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self::from_matrix(Matrix3::from_diagonal(&Vector3::new(a, b, c)))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    /// Lattice vector `axis` (0, 1 or 2).
    pub fn vector(&self, axis: usize) -> Vector3<f64> {
        self.matrix.row(axis).transpose()
    }

    pub fn is_defined(&self, axis: usize) -> bool {
        self.vector(axis).iter().any(|&x| x != 0.0)
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant()
    }

    /// Cartesian offset of the lattice point `n₀a + n₁b + n₂c`.
    pub fn offset(&self, n: [usize; 3]) -> Vector3<f64> {
        (0..3).fold(Vector3::zeros(), |acc, axis| {
            acc + self.vector(axis) * n[axis] as f64
        })
    }

    /// Offsets of every replica of a `m₀×m₁×m₂` supercell, the last index varying fastest.
    ///
    /// The first offset is always zero, so the first replica is the original.
    ///
    /// # Errors
    ///
    /// Fails if a multiplicity is zero, differs from one along a zero lattice vector, or
    /// the replica count exceeds [`MAX_REPLICAS`].
    pub fn replica_offsets(&self, m: [usize; 3]) -> Result<Vec<Vector3<f64>>, LatticeError> {
        for axis in 0..3 {
            if m[axis] == 0 {
                return Err(LatticeError::ZeroMultiplicity { axis });
            }
            if m[axis] != 1 && !self.is_defined(axis) {
                return Err(LatticeError::UndefinedLattice {
                    axis,
                    multiplicity: m[axis],
                });
            }
        }
        let count = replica_count(m)
            .filter(|&count| count <= MAX_REPLICAS)
            .ok_or(LatticeError::TooManyReplicas { multiplicities: m })?;
        let mut offsets = Vec::with_capacity(count);
        for n0 in 0..m[0] {
            for n1 in 0..m[1] {
                for n2 in 0..m[2] {
                    offsets.push(self.offset([n0, n1, n2]));
                }
            }
        }
        Ok(offsets)
    }

    /// The supercell spanned by `m₀a`, `m₁b`, `m₂c`.
    pub fn repeated(&self, m: [usize; 3]) -> Self {
        let mut matrix = self.matrix;
        for axis in 0..3 {
            let mut row = matrix.row_mut(axis);
            row *= m[axis] as f64;
        }
        Self { matrix }
    }

    /// Fractional coordinates of Cartesian points, solving `p = fᵀ · M`.
    pub fn fractional(&self, points: &[Point3<f64>]) -> Result<Vec<Vector3<f64>>, LatticeError> {
        let inverse = self
            .matrix
            .transpose()
            .try_inverse()
            .ok_or(LatticeError::Singular)?;
        Ok(points.iter().map(|p| inverse * p.coords).collect())
    }

    pub fn cartesian(&self, fractional: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix.transpose() * fractional)
    }

    /// Shortest periodic image of the displacement `d` along the `pbc` axes.
    ///
    /// Fractional components along periodic, defined axes are wrapped into
    /// `[-0.5, 0.5]`, which is the exact minimum image for orthogonal cells. Along
    /// other axes `d` is left as is.
    pub fn minimum_image(
        &self,
        d: &Vector3<f64>,
        pbc: [bool; 3],
    ) -> Result<Vector3<f64>, LatticeError> {
        let periodic: Vec<usize> = (0..3)
            .filter(|&axis| pbc[axis] && self.is_defined(axis))
            .collect();
        if periodic.is_empty() {
            return Ok(*d);
        }
        let inverse = self
            .matrix
            .transpose()
            .try_inverse()
            .ok_or(LatticeError::Singular)?;
        let mut f = inverse * d;
        for axis in periodic {
            f[axis] -= f[axis].round();
        }
        Ok(self.matrix.transpose() * f)
    }
}

/// `m₀·m₁·m₂`, or `None` on overflow.
pub fn replica_count(m: [usize; 3]) -> Option<usize> {
    m[0].checked_mul(m[1])?.checked_mul(m[2])
}
