//! Per-person records and the frame report.

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::compliance::resolver::{resolve_category, CategoryVerdict, VerdictStatus};
use crate::detect::{Detection, PpeCategory};
use crate::geometry::BoundingBox;

/// One person's box and the five category verdicts, in `PpeCategory::ALL` order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComplianceRecord {
    pub bbox: BoundingBox,
    categories: [CategoryVerdict; 5],
}

impl ComplianceRecord {
    /// Resolve all five categories for one person.
    pub fn evaluate(bbox: BoundingBox, assigned: &[&Detection]) -> Self {
        Self {
            bbox,
            categories: PpeCategory::ALL.map(|category| resolve_category(category, assigned)),
        }
    }

    /// Build a record from verdicts already in category order.
    pub fn from_verdicts(bbox: BoundingBox, categories: [CategoryVerdict; 5]) -> Result<Self> {
        for (verdict, expected) in categories.iter().zip(PpeCategory::ALL) {
            if verdict.category != expected {
                return Err(anyhow!(
                    "verdict for {} found where {} was expected",
                    verdict.category.name(),
                    expected.name()
                ));
            }
        }
        Ok(Self { bbox, categories })
    }

    pub fn categories(&self) -> &[CategoryVerdict; 5] {
        &self.categories
    }

    pub fn verdict(&self, category: PpeCategory) -> &CategoryVerdict {
        &self.categories[category.index()]
    }

    /// All five categories are `Used`.
    pub fn is_fully_compliant(&self) -> bool {
        self.categories.iter().all(CategoryVerdict::is_used)
    }

    /// At least one category is `NotUsed`.
    pub fn has_violation(&self) -> bool {
        self.categories.iter().any(CategoryVerdict::is_not_used)
    }

    /// Categories whose verdict is `NotUsed`.
    pub fn violations(&self) -> impl Iterator<Item = &CategoryVerdict> {
        self.categories
            .iter()
            .filter(|v| v.status == VerdictStatus::NotUsed)
    }
}

/// All records of one frame, in person detection order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameComplianceReport {
    pub records: Vec<ComplianceRecord>,
}

impl FrameComplianceReport {
    pub fn new(records: Vec<ComplianceRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComplianceRecord> {
        self.records.iter()
    }
}

/// Every category of every record is `Used`. True for a frame without people.
pub fn frame_is_fully_compliant(report: &FrameComplianceReport) -> bool {
    report.iter().all(ComplianceRecord::is_fully_compliant)
}

/// Any record carries a `NotUsed` verdict.
pub fn has_violation(report: &FrameComplianceReport) -> bool {
    report.iter().any(ComplianceRecord::has_violation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> BoundingBox {
        BoundingBox::from_corners(0.0, 0.0, 100.0, 200.0)
    }

    fn full_kit() -> Vec<Detection> {
        PpeCategory::ALL
            .iter()
            .map(|c| {
                Detection::new(
                    c.used_class_id(),
                    0.8,
                    BoundingBox::from_corners(40.0, 40.0, 60.0, 60.0),
                )
            })
            .collect()
    }

    #[test]
    fn fully_equipped_person_is_compliant() {
        let kit = full_kit();
        let refs: Vec<&Detection> = kit.iter().collect();
        let record = ComplianceRecord::evaluate(person(), &refs);
        assert!(record.is_fully_compliant());
        assert!(!record.has_violation());

        let report = FrameComplianceReport::new(vec![record]);
        assert!(frame_is_fully_compliant(&report));
        assert!(!has_violation(&report));
    }

    #[test]
    fn later_category_failure_breaks_compliance() {
        // Helmet is worn; only boots are missing. A first-category-only check
        // would wrongly call this frame safe.
        let mut kit = full_kit();
        kit.push(Detection::new(
            PpeCategory::Boots.not_used_class_id(),
            0.95,
            BoundingBox::from_corners(40.0, 150.0, 60.0, 190.0),
        ));
        let refs: Vec<&Detection> = kit.iter().collect();
        let record = ComplianceRecord::evaluate(person(), &refs);
        assert!(record.verdict(PpeCategory::Helmet).is_used());
        assert!(record.verdict(PpeCategory::Boots).is_not_used());

        let report = FrameComplianceReport::new(vec![record]);
        assert!(!frame_is_fully_compliant(&report));
        assert!(has_violation(&report));
        assert_eq!(report.records[0].violations().count(), 1);
    }

    #[test]
    fn unknown_is_neither_compliant_nor_violation() {
        let record = ComplianceRecord::evaluate(person(), &[]);
        let report = FrameComplianceReport::new(vec![record]);
        assert!(!frame_is_fully_compliant(&report));
        assert!(!has_violation(&report));
    }

    #[test]
    fn empty_report_is_vacuously_compliant() {
        let report = FrameComplianceReport::default();
        assert!(frame_is_fully_compliant(&report));
        assert!(!has_violation(&report));
    }

    #[test]
    fn verdicts_must_be_in_category_order() {
        let mut verdicts = PpeCategory::ALL.map(CategoryVerdict::unknown);
        assert!(ComplianceRecord::from_verdicts(person(), verdicts).is_ok());
        verdicts.swap(0, 1);
        assert!(ComplianceRecord::from_verdicts(person(), verdicts).is_err());
    }
}
