//! JSON encoding of frame reports.
//!
//! A report is an array of records, each
//! `[[x1,y1,x2,y2], [[status, used_box_or_0, not_used_box_or_0], ...5]]`
//! where `status` is `true`, `false` or `"unknown"` and an absent box is the
//! scalar `0`. Box coordinates are integers truncated toward zero.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::compliance::{
    CategoryVerdict, ComplianceRecord, Evidence, FrameComplianceReport, VerdictStatus,
};
use crate::detect::PpeCategory;
use crate::geometry::BoundingBox;

const UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum WireStatus {
    Flag(bool),
    Label(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum WireBox {
    Present([i32; 4]),
    Absent(u8),
}

type WireVerdict = (WireStatus, WireBox, WireBox);
type WireRecord = ([i32; 4], Vec<WireVerdict>);

fn box_to_wire(evidence: Option<&Evidence>) -> WireBox {
    match evidence {
        Some(evidence) => WireBox::Present(evidence.bbox.to_int_corners()),
        None => WireBox::Absent(0),
    }
}

fn box_from_wire(wire: WireBox) -> Result<Option<Evidence>> {
    match wire {
        WireBox::Present(corners) => Ok(Some(Evidence {
            bbox: BoundingBox::from_int_corners(corners),
            confidence: None,
        })),
        WireBox::Absent(0) => Ok(None),
        WireBox::Absent(other) => Err(anyhow!("absent box must be 0, found {}", other)),
    }
}

fn verdict_to_wire(verdict: &CategoryVerdict) -> WireVerdict {
    let status = match verdict.status {
        VerdictStatus::Used => WireStatus::Flag(true),
        VerdictStatus::NotUsed => WireStatus::Flag(false),
        VerdictStatus::Unknown => WireStatus::Label(UNKNOWN_LABEL.to_string()),
    };
    (
        status,
        box_to_wire(verdict.used.as_ref()),
        box_to_wire(verdict.not_used.as_ref()),
    )
}

fn verdict_from_wire(category: PpeCategory, wire: WireVerdict) -> Result<CategoryVerdict> {
    let (status, used, not_used) = wire;
    let status = match status {
        WireStatus::Flag(true) => VerdictStatus::Used,
        WireStatus::Flag(false) => VerdictStatus::NotUsed,
        WireStatus::Label(label) if label == UNKNOWN_LABEL => VerdictStatus::Unknown,
        WireStatus::Label(label) => return Err(anyhow!("unknown status label '{}'", label)),
    };
    let used = box_from_wire(used)?;
    let not_used = box_from_wire(not_used)?;

    let consistent = match status {
        VerdictStatus::Unknown => used.is_none() && not_used.is_none(),
        VerdictStatus::Used => used.is_some(),
        VerdictStatus::NotUsed => not_used.is_some(),
    };
    if !consistent {
        return Err(anyhow!(
            "{} verdict {:?} has inconsistent evidence boxes",
            category.name(),
            status
        ));
    }

    Ok(CategoryVerdict {
        category,
        status,
        used,
        not_used,
    })
}

/// Serialize a report to its wire JSON.
pub fn encode_report(report: &FrameComplianceReport) -> Result<Vec<u8>> {
    let records: Vec<WireRecord> = report
        .iter()
        .map(|record| {
            (
                record.bbox.to_int_corners(),
                record.categories().iter().map(verdict_to_wire).collect(),
            )
        })
        .collect();
    Ok(serde_json::to_vec(&records)?)
}

/// Parse wire JSON back into a report. Evidence confidences are not carried
/// on the wire and come back empty.
pub fn decode_report(payload: &[u8]) -> Result<FrameComplianceReport> {
    let records: Vec<WireRecord> =
        serde_json::from_slice(payload).context("invalid compliance report JSON")?;

    let mut out = Vec::with_capacity(records.len());
    for (index, (person, verdicts)) in records.into_iter().enumerate() {
        if verdicts.len() != PpeCategory::ALL.len() {
            return Err(anyhow!(
                "record {} has {} category verdicts, expected {}",
                index,
                verdicts.len(),
                PpeCategory::ALL.len()
            ));
        }
        let mut categories = PpeCategory::ALL.map(CategoryVerdict::unknown);
        for (slot, (category, wire)) in PpeCategory::ALL.into_iter().zip(verdicts).enumerate() {
            categories[slot] = verdict_from_wire(category, wire)
                .with_context(|| format!("record {}", index))?;
        }
        out.push(ComplianceRecord::from_verdicts(
            BoundingBox::from_int_corners(person),
            categories,
        )?);
    }
    Ok(FrameComplianceReport::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ComplianceEngine;
    use crate::detect::Detection;

    #[test]
    fn encodes_reference_layout() {
        let detections = [
            Detection::new(0, 0.9, BoundingBox::from_corners(10.7, 20.2, 110.9, 220.5)),
            Detection::new(1, 0.9, BoundingBox::from_corners(50.0, 25.0, 70.0, 45.0)),
            Detection::new(4, 0.7, BoundingBox::from_corners(30.0, 80.0, 90.0, 150.0)),
        ];
        let report = ComplianceEngine::default().evaluate(&detections);
        let json: serde_json::Value =
            serde_json::from_slice(&encode_report(&report).unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!([[
                [10, 20, 110, 220],
                [
                    [true, [50, 25, 70, 45], 0],
                    [false, 0, [30, 80, 90, 150]],
                    ["unknown", 0, 0],
                    ["unknown", 0, 0],
                    ["unknown", 0, 0]
                ]
            ]])
        );
    }

    #[test]
    fn empty_report_is_empty_array() {
        let bytes = encode_report(&FrameComplianceReport::default()).unwrap();
        assert_eq!(bytes, b"[]");
        assert!(decode_report(&bytes).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_payloads() {
        // Four verdicts instead of five.
        let short = br#"[[[0,0,10,10],[["unknown",0,0],["unknown",0,0],["unknown",0,0],["unknown",0,0]]]]"#;
        assert!(decode_report(short).is_err());

        // Absent box encoded as 1.
        let bad_absent = br#"[[[0,0,10,10],[["unknown",1,0],["unknown",0,0],["unknown",0,0],["unknown",0,0],["unknown",0,0]]]]"#;
        assert!(decode_report(bad_absent).is_err());

        // Unrecognized status label.
        let bad_label = br#"[[[0,0,10,10],[["maybe",0,0],["unknown",0,0],["unknown",0,0],["unknown",0,0],["unknown",0,0]]]]"#;
        assert!(decode_report(bad_label).is_err());

        // Used without a used box.
        let no_evidence = br#"[[[0,0,10,10],[[true,0,0],["unknown",0,0],["unknown",0,0],["unknown",0,0],["unknown",0,0]]]]"#;
        assert!(decode_report(no_evidence).is_err());

        assert!(decode_report(b"not json").is_err());
    }
}
