//! Splits a frame's detections into people and PPE candidates.

use crate::detect::{Detection, PpeClass};

/// Index partition of one frame's detections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub people: Vec<usize>,
    pub ppe_candidates: Vec<usize>,
    /// Indices skipped because their class id is outside the taxonomy.
    pub malformed: Vec<usize>,
}

/// Partition detection indices by class, preserving input order.
///
/// Detections with an unknown class id are skipped and logged; they never
/// abort the frame.
pub fn classify(detections: &[Detection]) -> Partition {
    let mut partition = Partition::default();
    for (index, detection) in detections.iter().enumerate() {
        match detection.class() {
            Some(PpeClass::Person) => partition.people.push(index),
            Some(PpeClass::Ppe { .. }) => partition.ppe_candidates.push(index),
            None => {
                log::warn!(
                    "skipping malformed detection #{}: class id {} outside taxonomy",
                    index,
                    detection.class_id
                );
                partition.malformed.push(index);
            }
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn det(class_id: u32) -> Detection {
        Detection::new(class_id, 0.5, BoundingBox::from_corners(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn partitions_in_input_order() {
        let detections = [det(3), det(0), det(10), det(0), det(1)];
        let partition = classify(&detections);
        assert_eq!(partition.people, vec![1, 3]);
        assert_eq!(partition.ppe_candidates, vec![0, 2, 4]);
        assert!(partition.malformed.is_empty());
    }

    #[test]
    fn unknown_classes_are_skipped() {
        let detections = [det(0), det(11), det(2), det(u32::MAX)];
        let partition = classify(&detections);
        assert_eq!(partition.people, vec![0]);
        assert_eq!(partition.ppe_candidates, vec![2]);
        assert_eq!(partition.malformed, vec![1, 3]);
    }
}
