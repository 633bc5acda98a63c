use anyhow::{Result, anyhow};
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::ocr::{BoundingPolygon, LabelFont, LabelStyle, OcrEngine, Point, Prediction};
use crate::pipeline::Pipeline;

/// Engine returning canned lines, one 40x12 box per line stacked down the image.
pub(crate) enum StubEngine {
    Lines(Vec<String>),
    Failing(String),
}

impl StubEngine {
    pub(crate) fn lines(lines: &[&str]) -> Self {
        StubEngine::Lines(lines.iter().map(|line| line.to_string()).collect())
    }

    pub(crate) fn failing(message: &str) -> Self {
        StubEngine::Failing(message.to_string())
    }
}

impl OcrEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn predict(&self, _image_path: &Path) -> Result<Vec<Prediction>> {
        let lines = match self {
            StubEngine::Lines(lines) => lines,
            StubEngine::Failing(message) => return Err(anyhow!("{}", message)),
        };
        let polys = (0..lines.len())
            .map(|idx| {
                let top = 4.0 + idx as f32 * 14.0;
                BoundingPolygon::new(vec![
                    Point::new(4.0, top),
                    Point::new(44.0, top),
                    Point::new(44.0, top + 12.0),
                    Point::new(4.0, top + 12.0),
                ])
            })
            .collect();
        Ok(vec![Prediction {
            rec_texts: Some(lines.clone()),
            rec_scores: Some(vec![0.9; lines.len()]),
            dt_polys: Some(polys),
        }])
    }
}

pub(crate) fn stub_pipeline(engine: StubEngine) -> Pipeline {
    Pipeline::new(Arc::new(engine), LabelStyle::new(LabelFont::builtin()))
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([250, 250, 250])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}
