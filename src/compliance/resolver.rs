//! Per-category usage decision for one person.

use serde::Serialize;

use crate::detect::{Detection, PpeCategory, PpeClass};
use crate::geometry::BoundingBox;

/// Outcome for one PPE category of one person.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VerdictStatus {
    Used,
    NotUsed,
    Unknown,
}

/// Box of the winning detection on one side of a category.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Evidence {
    pub bbox: BoundingBox,
    /// Detector confidence. The wire format does not carry it, so decoded
    /// reports leave it empty.
    pub confidence: Option<f32>,
}

impl Evidence {
    fn from_detection(detection: &Detection) -> Self {
        Self {
            bbox: detection.bbox,
            confidence: Some(detection.confidence),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CategoryVerdict {
    pub category: PpeCategory,
    pub status: VerdictStatus,
    pub used: Option<Evidence>,
    pub not_used: Option<Evidence>,
}

impl CategoryVerdict {
    pub fn unknown(category: PpeCategory) -> Self {
        Self {
            category,
            status: VerdictStatus::Unknown,
            used: None,
            not_used: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.status == VerdictStatus::Used
    }

    pub fn is_not_used(&self) -> bool {
        self.status == VerdictStatus::NotUsed
    }
}

/// First detection with the highest confidence.
fn strongest<'a>(detections: &[&'a Detection]) -> Option<&'a Detection> {
    let mut best: Option<&'a Detection> = None;
    for &detection in detections {
        if best.map_or(true, |b| detection.confidence > b.confidence) {
            best = Some(detection);
        }
    }
    best
}

/// Decide one category from a person's assigned detections.
///
/// Detections of other categories (and people) in `assigned` are ignored.
/// When both sides have evidence, "not used" must be strictly more confident
/// to win; equal confidences resolve to `Used`.
pub fn resolve_category(category: PpeCategory, assigned: &[&Detection]) -> CategoryVerdict {
    let mut used = Vec::new();
    let mut not_used = Vec::new();
    for &detection in assigned {
        if let Some(PpeClass::Ppe { category: c, worn }) = detection.class() {
            if c != category {
                continue;
            }
            if worn {
                used.push(detection);
            } else {
                not_used.push(detection);
            }
        }
    }

    let best_used = strongest(&used);
    let best_not_used = strongest(&not_used);

    let status = match (best_used, best_not_used) {
        (None, None) => return CategoryVerdict::unknown(category),
        (Some(_), None) => VerdictStatus::Used,
        (None, Some(_)) => VerdictStatus::NotUsed,
        (Some(u), Some(n)) => {
            if n.confidence > u.confidence {
                VerdictStatus::NotUsed
            } else {
                VerdictStatus::Used
            }
        }
    };

    CategoryVerdict {
        category,
        status,
        used: best_used.map(Evidence::from_detection),
        not_used: best_not_used.map(Evidence::from_detection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, confidence: f32, x: f32) -> Detection {
        Detection::new(
            class_id,
            confidence,
            BoundingBox::from_corners(x, 0.0, x + 10.0, 10.0),
        )
    }

    #[test]
    fn empty_category_is_unknown() {
        let vest = det(3, 0.9, 0.0);
        let verdict = resolve_category(PpeCategory::Helmet, &[&vest]);
        assert_eq!(verdict, CategoryVerdict::unknown(PpeCategory::Helmet));
    }

    #[test]
    fn used_only_keeps_best_used_box() {
        let a = det(1, 0.4, 0.0);
        let b = det(1, 0.9, 20.0);
        let verdict = resolve_category(PpeCategory::Helmet, &[&a, &b]);
        assert_eq!(verdict.status, VerdictStatus::Used);
        assert_eq!(verdict.used.unwrap().bbox, b.bbox);
        assert_eq!(verdict.used.unwrap().confidence, Some(0.9));
        assert!(verdict.not_used.is_none());
    }

    #[test]
    fn not_used_only_has_no_used_evidence() {
        let a = det(6, 0.3, 0.0);
        let verdict = resolve_category(PpeCategory::Glasses, &[&a]);
        assert_eq!(verdict.status, VerdictStatus::NotUsed);
        assert!(verdict.used.is_none());
        assert_eq!(verdict.not_used.unwrap().bbox, a.bbox);
    }

    #[test]
    fn stronger_not_used_wins_and_keeps_both_boxes() {
        let used = det(3, 0.4, 0.0);
        let missing = det(4, 0.7, 20.0);
        let verdict = resolve_category(PpeCategory::Vest, &[&used, &missing]);
        assert_eq!(verdict.status, VerdictStatus::NotUsed);
        assert_eq!(verdict.used.unwrap().bbox, used.bbox);
        assert_eq!(verdict.not_used.unwrap().bbox, missing.bbox);
    }

    #[test]
    fn equal_confidence_resolves_to_used() {
        let used = det(7, 0.6, 0.0);
        let missing = det(8, 0.6, 20.0);
        let verdict = resolve_category(PpeCategory::Gloves, &[&missing, &used]);
        assert_eq!(verdict.status, VerdictStatus::Used);
        assert!(verdict.used.is_some());
        assert!(verdict.not_used.is_some());
    }

    #[test]
    fn first_detection_wins_exact_ties() {
        let first = det(9, 0.5, 0.0);
        let second = det(9, 0.5, 50.0);
        let verdict = resolve_category(PpeCategory::Boots, &[&first, &second]);
        assert_eq!(verdict.used.unwrap().bbox, first.bbox);
    }
}
