use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Object-level transform of a site collection.
///
/// Site positions are stored in the local frame:
/// `global = translation + rotation * (scale ⊙ local)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translation: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn is_identity(&self) -> bool {
        self.translation == Vector3::zeros()
            && self.rotation == UnitQuaternion::identity()
            && self.scale == Vector3::new(1.0, 1.0, 1.0)
    }

    /// A placement can be inverted only if every scale component is finite and non-zero.
    pub fn is_invertible(&self) -> bool {
        self.scale.iter().all(|s| s.is_finite() && *s != 0.0)
            && self.translation.iter().all(|t| t.is_finite())
    }

    pub fn to_global(&self, local: &Point3<f64>) -> Point3<f64> {
        if self.is_identity() {
            return *local;
        }
        let scaled = local.coords.component_mul(&self.scale);
        Point3::from(self.rotation * scaled + self.translation)
    }

    pub fn to_local(&self, global: &Point3<f64>) -> Point3<f64> {
        if self.is_identity() {
            return *global;
        }
        let unrotated = self.rotation.inverse() * (global.coords - self.translation);
        Point3::from(unrotated.component_div(&self.scale))
    }

    pub fn points_to_global(&self, locals: &[Point3<f64>]) -> Vec<Point3<f64>> {
        locals.iter().map(|p| self.to_global(p)).collect()
    }

    pub fn points_to_local(&self, globals: &[Point3<f64>]) -> Vec<Point3<f64>> {
        globals.iter().map(|p| self.to_local(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_round_trip_is_exact() {
        let placement = Placement::identity();
        let p = Point3::new(0.1, -2.3e-7, 1e12);
        assert_eq!(placement.to_global(&p), p);
        assert_eq!(placement.to_local(&p), p);
    }

    #[test]
    fn translation_rotation_and_scale_are_applied_in_order() {
        let placement = Placement {
            translation: Vector3::new(1.0, 0.0, 0.0),
            rotation: UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        let global = placement.to_global(&Point3::new(1.0, 0.0, 0.0));
        assert!((global - Point3::new(1.0, 2.0, 0.0)).norm() < 1e-12);
        let local = placement.to_local(&global);
        assert!((local - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn zero_scale_is_not_invertible() {
        let mut placement = Placement::from_translation(Vector3::new(0.0, 1.0, 0.0));
        assert!(placement.is_invertible());
        placement.scale.y = 0.0;
        assert!(!placement.is_invertible());
    }
}
