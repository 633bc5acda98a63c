mod engine;
mod extract;
mod font;
mod render;

use serde::{Deserialize, Serialize};

pub use engine::{CommandEngine, OcrEngine, Prediction, TesseractEngine, list_tesseract_languages};
pub use extract::{Extraction, MALFORMED_MESSAGE, RecognizedLines, extract};
pub use font::{FALLBACK_FONT_PATHS, LabelFont, resolve_label_font};
pub use render::{LABEL_OFFSET_Y, LabelStyle, annotate, format_label, label_anchor, overlay_markup};

/// A vertex in image pixel coordinates. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// Ordered vertex list outlining one detected text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingPolygon {
    pub vertices: Vec<Point>,
}

impl BoundingPolygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygons_deserialize_from_nested_pairs() {
        let polygon: BoundingPolygon =
            serde_json::from_str("[[1, 2], [3.5, 2], [3.5, 8], [1, 8]]").expect("polygon");
        assert_eq!(polygon.vertices.len(), 4);
        assert_eq!(polygon.vertices[1], Point::new(3.5, 2.0));
        let back = serde_json::to_string(&polygon).expect("serialize");
        assert_eq!(back, "[[1.0,2.0],[3.5,2.0],[3.5,8.0],[1.0,8.0]]");
    }
}
