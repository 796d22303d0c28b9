//! Axis-aligned box geometry shared by the detector backends and the engine.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates, stored in corner form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from center form `(cx, cy, w, h)`.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Center form `(cx, cy, w, h)`.
    pub fn to_center_form(&self) -> (f32, f32, f32, f32) {
        let (cx, cy) = self.center();
        (cx, cy, self.width(), self.height())
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Strict point-in-rectangle test (`cx - w/2 < x < cx + w/2`, same for y).
    ///
    /// Evaluated on the stored corners so border points are excluded exactly.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.x1 < x && x < self.x2 && self.y1 < y && y < self.y2
    }

    /// True when the center of `other` lies strictly inside `self`.
    pub fn contains_center_of(&self, other: &BoundingBox) -> bool {
        let (x, y) = other.center();
        self.contains_point(x, y)
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    /// Intersection over union. A zero-area union yields `0.0`.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Corners truncated toward zero, as carried on the wire.
    pub fn to_int_corners(&self) -> [i32; 4] {
        [
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        ]
    }

    pub fn from_int_corners(corners: [i32; 4]) -> Self {
        Self {
            x1: corners[0] as f32,
            y1: corners[1] as f32,
            x2: corners[2] as f32,
            y2: corners[3] as f32,
        }
    }

    /// Scale both axes, e.g. from model input space back to the source image.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }
}
