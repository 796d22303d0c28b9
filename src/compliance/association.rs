//! Geometric assignment of PPE candidates to people.
//!
//! A candidate belongs to a person when the candidate's box center lies
//! strictly inside the person's box. The test is binary; overlap ratios are
//! only ever reported as diagnostics.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::detect::Detection;

/// How a candidate contained in several people is handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AssociationPolicy {
    /// Every containing person receives the candidate.
    #[default]
    Shared,
    /// Only the containing person whose center is closest receives it.
    /// Equal distances go to the person detected first.
    NearestCenter,
}

impl AssociationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AssociationPolicy::Shared => "shared",
            AssociationPolicy::NearestCenter => "nearest_center",
        }
    }
}

impl FromStr for AssociationPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(AssociationPolicy::Shared),
            "nearest_center" | "nearest-center" => Ok(AssociationPolicy::NearestCenter),
            other => Err(anyhow!(
                "unknown association policy '{}' (expected shared or nearest_center)",
                other
            )),
        }
    }
}

impl TryFrom<String> for AssociationPolicy {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// One candidate assigned to a person.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Member {
    /// Index into the frame's detection list.
    pub index: usize,
    /// IoU between person and candidate, present only when diagnostics are on.
    pub overlap: Option<f32>,
}

/// Candidates assigned to one person.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonAssignment {
    /// Index of the person in the frame's detection list.
    pub person: usize,
    pub members: Vec<Member>,
}

impl PersonAssignment {
    pub fn member_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|m| m.index)
    }
}

/// Assign candidates to people. One entry per person, in `people` order.
///
/// Candidates contained in nobody are dropped.
pub fn associate(
    detections: &[Detection],
    people: &[usize],
    candidates: &[usize],
    policy: AssociationPolicy,
    with_overlap: bool,
) -> Vec<PersonAssignment> {
    let mut assignments: Vec<PersonAssignment> = people
        .iter()
        .map(|&person| PersonAssignment {
            person,
            members: Vec::new(),
        })
        .collect();

    for &candidate in candidates {
        let candidate_box = &detections[candidate].bbox;
        let containing = people
            .iter()
            .enumerate()
            .filter(|(_, person)| detections[**person].bbox.contains_center_of(candidate_box));

        let mut push = |slot: usize, person: usize| {
            let overlap = with_overlap.then(|| detections[person].bbox.iou(candidate_box));
            assignments[slot].members.push(Member {
                index: candidate,
                overlap,
            });
        };

        match policy {
            AssociationPolicy::Shared => {
                for (slot, &person) in containing {
                    push(slot, person);
                }
            }
            AssociationPolicy::NearestCenter => {
                let (cx, cy) = candidate_box.center();
                let mut nearest: Option<(usize, usize, f32)> = None;
                for (slot, &person) in containing {
                    let (px, py) = detections[person].bbox.center();
                    let distance = (px - cx).powi(2) + (py - cy).powi(2);
                    if nearest.map_or(true, |(_, _, best)| distance < best) {
                        nearest = Some((slot, person, distance));
                    }
                }
                if let Some((slot, person, _)) = nearest {
                    push(slot, person);
                }
            }
        }
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn det(class_id: u32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(class_id, 0.8, BoundingBox::from_corners(x1, y1, x2, y2))
    }

    #[test]
    fn contained_candidates_are_assigned() {
        let detections = [
            det(0, 0.0, 0.0, 100.0, 200.0),
            det(1, 40.0, 0.0, 60.0, 20.0),
            det(3, 300.0, 300.0, 320.0, 320.0),
        ];
        let assignments =
            associate(&detections, &[0], &[1, 2], AssociationPolicy::Shared, false);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].person, 0);
        assert_eq!(assignments[0].member_indices().collect::<Vec<_>>(), vec![1]);
        assert_eq!(assignments[0].members[0].overlap, None);
    }

    #[test]
    fn shared_policy_double_counts_overlapping_people() {
        let detections = [
            det(0, 0.0, 0.0, 100.0, 100.0),
            det(0, 50.0, 0.0, 150.0, 100.0),
            det(1, 70.0, 10.0, 90.0, 30.0),
        ];
        let assignments =
            associate(&detections, &[0, 1], &[2], AssociationPolicy::Shared, false);
        assert_eq!(assignments[0].member_indices().collect::<Vec<_>>(), vec![2]);
        assert_eq!(assignments[1].member_indices().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn nearest_center_policy_assigns_once() {
        let detections = [
            det(0, 0.0, 0.0, 100.0, 100.0),
            det(0, 50.0, 0.0, 150.0, 100.0),
            det(1, 90.0, 10.0, 110.0, 30.0),
            det(1, 60.0, 10.0, 80.0, 30.0),
        ];
        let assignments = associate(
            &detections,
            &[0, 1],
            &[2, 3],
            AssociationPolicy::NearestCenter,
            false,
        );
        // Candidate 2 sits on person 0's right border, so only person 1 holds
        // it. Candidate 3 is inside both and nearer person 0.
        assert_eq!(assignments[0].member_indices().collect::<Vec<_>>(), vec![3]);
        assert_eq!(assignments[1].member_indices().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn nearest_center_ties_go_to_first_person() {
        let detections = [
            det(0, 0.0, 0.0, 100.0, 100.0),
            det(0, 0.0, 0.0, 100.0, 100.0),
            det(5, 40.0, 40.0, 60.0, 60.0),
        ];
        let assignments = associate(
            &detections,
            &[0, 1],
            &[2],
            AssociationPolicy::NearestCenter,
            false,
        );
        assert_eq!(assignments[0].members.len(), 1);
        assert!(assignments[1].members.is_empty());
    }

    #[test]
    fn overlap_is_reported_without_affecting_membership() {
        let detections = [
            det(0, 0.0, 0.0, 100.0, 100.0),
            det(7, 45.0, 45.0, 55.0, 55.0),
        ];
        let assignments = associate(&detections, &[0], &[1], AssociationPolicy::Shared, true);
        let overlap = assignments[0].members[0].overlap.unwrap();
        assert!((overlap - 0.01).abs() < 1e-6);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "shared".parse::<AssociationPolicy>().unwrap(),
            AssociationPolicy::Shared
        );
        assert_eq!(
            "Nearest-Center".parse::<AssociationPolicy>().unwrap(),
            AssociationPolicy::NearestCenter
        );
        assert!("closest".parse::<AssociationPolicy>().is_err());
    }

    #[test]
    fn config_file_accepts_the_same_spellings_as_the_environment() {
        for spelling in ["nearest_center", "nearest-center", "Nearest_Center"] {
            let policy: AssociationPolicy =
                serde_json::from_value(serde_json::json!(spelling)).unwrap();
            assert_eq!(policy, AssociationPolicy::NearestCenter);
        }
        assert!(serde_json::from_value::<AssociationPolicy>(serde_json::json!("closest")).is_err());
    }
}
