use crate::ocr::{BoundingPolygon, Point};

/// Axis-aligned box as tesseract reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BBoxPx {
    pub(super) x: u32,
    pub(super) y: u32,
    pub(super) w: u32,
    pub(super) h: u32,
}

pub(super) fn union_bbox(a: &BBoxPx, b: &BBoxPx) -> BBoxPx {
    let x1 = a.x.min(b.x);
    let y1 = a.y.min(b.y);
    let x2 = (a.x + a.w).max(b.x + b.w);
    let y2 = (a.y + a.h).max(b.y + b.h);
    BBoxPx {
        x: x1,
        y: y1,
        w: x2 - x1,
        h: y2 - y1,
    }
}

/// Clockwise quad starting at the top-left corner, the vertex order detectors emit.
pub(super) fn bbox_polygon(bbox: &BBoxPx) -> BoundingPolygon {
    let left = bbox.x as f32;
    let top = bbox.y as f32;
    let right = (bbox.x + bbox.w) as f32;
    let bottom = (bbox.y + bbox.h) as f32;
    BoundingPolygon::new(vec![
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ])
}
