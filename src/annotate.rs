//! Draws compliance reports onto captured frames.
//!
//! Person boxes are solid: red when the person has any `NotUsed` verdict,
//! green otherwise. The evidence box of every `NotUsed` verdict is drawn as a
//! dashed rectangle whose edges start and end with a solid run, labelled
//! with the missing category.

use ab_glyph::{FontRef, PxScale};
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::compliance::FrameComplianceReport;
use crate::detect::PpeCategory;
use crate::geometry::BoundingBox;

static FONT_BYTES: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");

pub const VIOLATION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const COMPLIANT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const PERSON_STROKE: i32 = 4;
const EVIDENCE_STROKE: i32 = 2;
const SOLID_END: f32 = 20.0;
const DASH: f32 = 15.0;
const GAP: f32 = 10.0;
const LABEL_SCALE: f32 = 20.0;
const LABEL_INSET: i32 = 4;

pub fn annotate(image: &mut RgbImage, report: &FrameComplianceReport) -> Result<()> {
    let font = FontRef::try_from_slice(FONT_BYTES)
        .map_err(|_| anyhow!("bundled label font is invalid"))?;
    for record in report.iter() {
        for verdict in record.violations() {
            if let Some(evidence) = &verdict.not_used {
                draw_dashed_box(image, &evidence.bbox, VIOLATION_COLOR);
                draw_label(image, &font, &evidence.bbox, verdict.category);
            }
        }
        let color = if record.has_violation() {
            VIOLATION_COLOR
        } else {
            COMPLIANT_COLOR
        };
        draw_solid_box(image, &record.bbox, color, PERSON_STROKE);
    }
    Ok(())
}

/// `no <category>` just inside the top-left corner of the evidence box.
fn draw_label(image: &mut RgbImage, font: &FontRef, bbox: &BoundingBox, category: PpeCategory) {
    let [x1, y1, _, _] = bbox.to_int_corners();
    draw_text_mut(
        image,
        VIOLATION_COLOR,
        x1 + LABEL_INSET,
        y1 + LABEL_INSET,
        PxScale::from(LABEL_SCALE),
        font,
        &format!("no {}", category.name()),
    );
}

fn draw_solid_box(image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, stroke: i32) {
    let [x1, y1, x2, y2] = bbox.to_int_corners();
    for inset in 0..stroke {
        let (left, top) = (x1 + inset, y1 + inset);
        let (right, bottom) = (x2 - inset, y2 - inset);
        if right <= left || bottom <= top {
            break;
        }
        let rect = Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

fn draw_dashed_box(image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let [x1, y1, x2, y2] = bbox.to_int_corners().map(|v| v as f32);
    for inset in 0..EVIDENCE_STROKE {
        let k = inset as f32;
        draw_dashed_line(image, (x1, y1 + k), (x2, y1 + k), color);
        draw_dashed_line(image, (x1, y2 - k), (x2, y2 - k), color);
        draw_dashed_line(image, (x1 + k, y1), (x1 + k, y2), color);
        draw_dashed_line(image, (x2 - k, y1), (x2 - k, y2), color);
    }
}

fn draw_dashed_line(image: &mut RgbImage, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return;
    }
    let point = |t: f32| (from.0 + dx * t / length, from.1 + dy * t / length);

    if length <= 2.0 * SOLID_END {
        draw_line_segment_mut(image, from, to, color);
        return;
    }
    draw_line_segment_mut(image, from, point(SOLID_END), color);
    draw_line_segment_mut(image, point(length - SOLID_END), to, color);

    let mut t = SOLID_END;
    while t + DASH <= length - SOLID_END {
        draw_line_segment_mut(image, point(t), point(t + DASH), color);
        t += DASH + GAP;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ComplianceEngine;
    use crate::detect::Detection;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[test]
    fn colors_person_by_violation() {
        let detections = [
            Detection::new(0, 0.9, BoundingBox::from_corners(10.0, 10.0, 150.0, 190.0)),
            Detection::new(2, 0.8, BoundingBox::from_corners(30.0, 40.0, 130.0, 80.0)),
            Detection::new(0, 0.9, BoundingBox::from_corners(160.0, 10.0, 230.0, 190.0)),
        ];
        let report = ComplianceEngine::default().evaluate(&detections);
        let mut image = RgbImage::new(240, 200);
        annotate(&mut image, &report).unwrap();

        assert_eq!(*image.get_pixel(10, 10), VIOLATION_COLOR);
        assert_eq!(*image.get_pixel(160, 10), COMPLIANT_COLOR);
        assert_eq!(*image.get_pixel(100, 100), BLACK);
    }

    #[test]
    fn evidence_box_is_dashed_with_solid_ends() {
        let detections = [
            Detection::new(0, 0.9, BoundingBox::from_corners(0.0, 0.0, 200.0, 200.0)),
            Detection::new(2, 0.8, BoundingBox::from_corners(50.0, 50.0, 150.0, 100.0)),
        ];
        let report = ComplianceEngine::default().evaluate(&detections);
        let mut image = RgbImage::new(200, 200);
        annotate(&mut image, &report).unwrap();

        // Solid runs at both ends of the top edge.
        assert_eq!(*image.get_pixel(55, 50), VIOLATION_COLOR);
        assert_eq!(*image.get_pixel(145, 50), VIOLATION_COLOR);
        // First dash covers 20..35 from the corner, the gap 35..45.
        assert_eq!(*image.get_pixel(75, 50), VIOLATION_COLOR);
        assert_eq!(*image.get_pixel(90, 50), BLACK);
    }

    fn painted(image: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| *image.get_pixel(x, y) != BLACK)
            .count()
    }

    #[test]
    fn labels_missing_category_inside_evidence_box() {
        let detections = [
            Detection::new(0, 0.9, BoundingBox::from_corners(0.0, 0.0, 200.0, 200.0)),
            Detection::new(2, 0.8, BoundingBox::from_corners(20.0, 60.0, 180.0, 120.0)),
        ];
        let report = ComplianceEngine::default().evaluate(&detections);
        let mut image = RgbImage::new(200, 200);
        annotate(&mut image, &report).unwrap();

        // Interior of the evidence box, clear of its edges.
        assert!(painted(&image, 24..120, 64..100) > 20);
        // Label text is anti-aliased red on black.
        assert!(
            (24..120)
                .flat_map(|x| (64..100).map(move |y| (x, y)))
                .map(|(x, y)| image.get_pixel(x, y))
                .all(|px| px[1] == 0 && px[2] == 0)
        );
    }

    #[test]
    fn compliant_person_gets_no_label() {
        let detections = [
            Detection::new(0, 0.9, BoundingBox::from_corners(0.0, 0.0, 200.0, 200.0)),
            Detection::new(1, 0.8, BoundingBox::from_corners(20.0, 60.0, 180.0, 120.0)),
        ];
        let report = ComplianceEngine::default().evaluate(&detections);
        let mut image = RgbImage::new(200, 200);
        annotate(&mut image, &report).unwrap();

        assert_eq!(painted(&image, 10..190, 10..190), 0);
    }
}
