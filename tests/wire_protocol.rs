use std::io::Cursor;

use ppe_guard::wire::{decode_report, encode_report, read_frame, write_frame};
use ppe_guard::{BoundingBox, ComplianceEngine, Detection, PpeCategory, VerdictStatus};

fn frame_detections() -> Vec<Detection> {
    vec![
        Detection::new(0, 0.9, BoundingBox::from_corners(0.0, 0.0, 100.0, 200.0)),
        Detection::new(0, 0.8, BoundingBox::from_corners(200.0, 0.0, 300.0, 200.0)),
        Detection::new(1, 0.9, BoundingBox::from_corners(40.0, 10.0, 60.0, 30.0)),
        Detection::new(4, 0.7, BoundingBox::from_corners(30.0, 70.0, 70.0, 110.0)),
        Detection::new(3, 0.4, BoundingBox::from_corners(35.0, 75.0, 65.0, 105.0)),
        Detection::new(8, 0.6, BoundingBox::from_corners(210.0, 120.0, 230.0, 140.0)),
    ]
}

#[test]
fn report_survives_the_wire() {
    let report = ComplianceEngine::default().evaluate(&frame_detections());
    let decoded = decode_report(&encode_report(&report).unwrap()).unwrap();

    assert_eq!(decoded.len(), report.len());
    for (sent, received) in report.iter().zip(decoded.iter()) {
        assert_eq!(sent.bbox, received.bbox);
        for (a, b) in sent.categories().iter().zip(received.categories()) {
            assert_eq!(a.category, b.category);
            assert_eq!(a.status, b.status);
            assert_eq!(a.used.map(|e| e.bbox), b.used.map(|e| e.bbox));
            assert_eq!(a.not_used.map(|e| e.bbox), b.not_used.map(|e| e.bbox));
            assert!(b.used.iter().chain(b.not_used.iter()).all(|e| e.confidence.is_none()));
        }
    }

    let second = &decoded.records[1];
    assert_eq!(second.verdict(PpeCategory::Gloves).status, VerdictStatus::NotUsed);
    assert_eq!(second.verdict(PpeCategory::Helmet).status, VerdictStatus::Unknown);
}

#[test]
fn framed_report_reads_back_from_a_stream() {
    let report = ComplianceEngine::default().evaluate(&frame_detections());
    let payload = encode_report(&report).unwrap();

    let mut buf = Vec::new();
    write_frame(&mut buf, &payload).unwrap();
    assert_eq!(&buf[..4], &(payload.len() as u32).to_be_bytes());

    let mut reader = Cursor::new(buf);
    let received = read_frame(&mut reader, 1024 * 1024).unwrap();
    assert_eq!(received, payload);
}

#[test]
fn fractional_boxes_are_truncated_on_the_wire() {
    let report = ComplianceEngine::default().evaluate(&[Detection::new(
        0,
        0.9,
        BoundingBox::from_corners(10.9, 20.5, 110.2, 220.99),
    )]);
    let json: serde_json::Value =
        serde_json::from_slice(&encode_report(&report).unwrap()).unwrap();
    assert_eq!(json[0][0], serde_json::json!([10, 20, 110, 220]));
}
