//! Compliance inference engine.
//!
//! Turns one frame's detections into a `FrameComplianceReport`:
//!
//! 1. `classifier` splits detections into people and PPE candidates
//! 2. `association` assigns candidates to people by center containment
//! 3. `resolver` decides Used / NotUsed / Unknown per category
//! 4. `report` assembles records and frame-level predicates
//!
//! The engine holds no per-frame state and is safe to share across threads.

pub mod association;
pub mod classifier;
pub mod report;
pub mod resolver;

pub use association::{associate, AssociationPolicy, Member, PersonAssignment};
pub use classifier::{classify, Partition};
pub use report::{frame_is_fully_compliant, has_violation, ComplianceRecord, FrameComplianceReport};
pub use resolver::{resolve_category, CategoryVerdict, Evidence, VerdictStatus};

use crate::detect::Detection;

#[derive(Clone, Copy, Debug, Default)]
pub struct ComplianceEngine {
    policy: AssociationPolicy,
    overlap_diagnostics: bool,
}

impl ComplianceEngine {
    pub fn new(policy: AssociationPolicy) -> Self {
        Self {
            policy,
            overlap_diagnostics: false,
        }
    }

    /// Log person/candidate IoU at debug level. Never changes a verdict.
    pub fn with_overlap_diagnostics(mut self, enabled: bool) -> Self {
        self.overlap_diagnostics = enabled;
        self
    }

    /// Assignment of candidates to people, one entry per person.
    pub fn assign(&self, detections: &[Detection]) -> Vec<PersonAssignment> {
        let partition = classify(detections);
        associate(
            detections,
            &partition.people,
            &partition.ppe_candidates,
            self.policy,
            self.overlap_diagnostics,
        )
    }

    /// Judge one frame. No people yields an empty report.
    pub fn evaluate(&self, detections: &[Detection]) -> FrameComplianceReport {
        let assignments = self.assign(detections);
        let records = assignments
            .iter()
            .map(|assignment| {
                if self.overlap_diagnostics {
                    for member in &assignment.members {
                        if let Some(overlap) = member.overlap {
                            log::debug!(
                                "person #{} <- detection #{} (class {}) iou={:.3}",
                                assignment.person,
                                member.index,
                                detections[member.index].class_id,
                                overlap
                            );
                        }
                    }
                }
                let assigned: Vec<&Detection> = assignment
                    .member_indices()
                    .map(|index| &detections[index])
                    .collect();
                ComplianceRecord::evaluate(detections[assignment.person].bbox, &assigned)
            })
            .collect();
        FrameComplianceReport::new(records)
    }
}
