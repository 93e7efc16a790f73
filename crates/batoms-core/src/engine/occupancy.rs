use crate::core::models::instance::Instance;
use crate::core::models::species::OccupancyTable;
use nalgebra::Vector3;
use std::f64::consts::PI;

/// Splits the faces of an instance mesh into angular wedges, one per element.
///
/// Elements are ordered by descending occupancy (ties keep definition order) and
/// element `i` receives the faces whose normal azimuth, measured in turns, lies in
/// `[c(i-1), c(i))` where `c` is the cumulative occupancy. Element 0 owns `[0, c0)`
/// and any face no other wedge claims.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccupancyColorAssigner;

impl OccupancyColorAssigner {
    /// Azimuth of a face normal in the equatorial plane, in turns within `[0, 1)`.
    pub fn face_angle(normal: &Vector3<f64>) -> f64 {
        let turns = (normal.y.atan2(normal.x) + PI) / (2.0 * PI);
        if turns >= 1.0 { turns - 1.0 } else { turns }
    }

    /// Material slot of each angle for wedge sizes `fractions`, given in slot order.
    pub fn partition(angles: &[f64], fractions: &[f64]) -> Vec<usize> {
        angles
            .iter()
            .map(|&angle| Self::slot_for(angle, fractions))
            .collect()
    }

    fn slot_for(angle: f64, fractions: &[f64]) -> usize {
        let Some((&first, rest)) = fractions.split_first() else {
            return 0;
        };
        let mut start = first;
        for (offset, &fraction) in rest.iter().enumerate() {
            let end = start + fraction;
            if angle >= start && angle < end {
                return offset + 1;
            }
            start = end;
        }
        0
    }

    /// Writes the per-face material slots of `instance` for `occupancies`.
    ///
    /// A single-element table puts every face in slot 0. The result only depends on
    /// the face normals and the table, so repeated calls give identical assignments.
    pub fn assign(&self, instance: &mut Instance, occupancies: &OccupancyTable) {
        let fractions: Vec<f64> = occupancies.sorted().into_iter().map(|(_, o)| o).collect();
        if fractions.len() <= 1 {
            instance.mesh_mut().assign_materials_by_normal(|_| 0);
            return;
        }
        instance.mesh_mut().assign_materials_by_normal(|normal| {
            Self::slot_for(Self::face_angle(normal), &fractions)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::instance::InstanceShape;
    use crate::core::models::species::ElementComposition;

    fn instance(shape: InstanceShape) -> Instance {
        Instance::new("test_instancer_atom_x".to_string(), shape, 1.0, [1.0; 3])
    }

    fn table(entries: &[(&str, f64)]) -> OccupancyTable {
        OccupancyTable::new(&ElementComposition::fractional(entries.iter().copied())).unwrap()
    }

    #[test]
    fn face_angle_maps_directions_to_turns() {
        let angle = |x: f64, y: f64| OccupancyColorAssigner::face_angle(&Vector3::new(x, y, 0.0));
        assert_eq!(angle(-1.0, -0.0), 0.0);
        assert!((angle(1.0, 0.0) - 0.5).abs() < 1e-12);
        assert!((angle(0.0, 1.0) - 0.75).abs() < 1e-12);
        assert!((0.0..1.0).contains(&angle(-1.0, 0.0)));
    }

    #[test]
    fn partition_follows_cumulative_wedges() {
        let angles = [0.0, 0.3, 0.5, 0.6, 0.85, 0.99, 1.0];
        let slots = OccupancyColorAssigner::partition(&angles, &[0.5, 0.3, 0.2]);
        assert_eq!(slots, vec![0, 0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn al_si_species_splits_faces_three_to_one() {
        let mut instance = instance(InstanceShape::default());
        OccupancyColorAssigner.assign(&mut instance, &table(&[("Al", 0.75), ("Si", 0.25)]));
        let counts = instance.mesh().material_face_counts(2);
        assert_eq!(counts.iter().sum::<usize>(), 512);
        assert_eq!(counts, vec![384, 128]);
    }

    #[test]
    fn minority_wedge_is_contiguous() {
        let mut instance = instance(InstanceShape::default());
        OccupancyColorAssigner.assign(&mut instance, &table(&[("Al", 0.75), ("Si", 0.25)]));
        let normals = instance.mesh().face_normals();
        for (normal, &slot) in normals.iter().zip(instance.mesh().material_indices()) {
            let angle = OccupancyColorAssigner::face_angle(normal);
            assert_eq!(slot == 1, angle >= 0.75, "angle {} got slot {}", angle, slot);
        }
    }

    #[test]
    fn assignment_is_idempotent() {
        let occupancies = table(&[("Fe", 0.5), ("Ni", 0.3)]);
        let mut instance = instance(InstanceShape::ico_sphere());
        OccupancyColorAssigner.assign(&mut instance, &occupancies);
        let first = instance.mesh().material_indices().to_vec();
        OccupancyColorAssigner.assign(&mut instance, &occupancies);
        assert_eq!(instance.mesh().material_indices(), first.as_slice());
        assert!(first.contains(&2));
    }

    #[test]
    fn pure_species_uses_a_single_slot() {
        let mut instance = instance(InstanceShape::Cube);
        OccupancyColorAssigner.assign(&mut instance, &table(&[("Cu", 1.0)]));
        assert!(instance.mesh().material_indices().iter().all(|&i| i == 0));
    }
}
