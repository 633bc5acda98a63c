mod command;
mod geom;
mod parse;
mod tesseract;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::ocr::BoundingPolygon;

pub use command::CommandEngine;
pub use tesseract::list_tesseract_languages;

/// One image's worth of engine output.
///
/// Every key is optional because engines are free to omit fields; nothing here is trusted
/// until [`crate::ocr::extract`] has checked it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub rec_texts: Option<Vec<String>>,
    #[serde(default)]
    pub rec_scores: Option<Vec<f32>>,
    #[serde(default)]
    pub dt_polys: Option<Vec<BoundingPolygon>>,
}

/// A text detector + recognizer that works on one image file at a time.
///
/// The pipeline shares a single engine across every request without any locking, so
/// implementations must be safe to call from several threads. An engine backed by a
/// thread-unsafe model has to serialize access itself.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Runs detection and recognition on `image_path`.
    ///
    /// Returns one [`Prediction`] per input image, so a single path normally yields a
    /// single element. Engine faults (missing binary, unreadable image) are errors.
    fn predict(&self, image_path: &Path) -> Result<Vec<Prediction>>;
}

/// Tesseract driven through its command-line interface.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    languages: String,
    psm: u32,
}

impl TesseractEngine {
    /// `languages` accepts `fra`, `eng+fra` or `eng,fra`; unknown entries are dropped.
    pub fn new(languages: &str) -> Result<Self> {
        let languages = tesseract::normalize_ocr_languages(languages)?;
        Ok(Self { languages, psm: 3 })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn predict(&self, image_path: &Path) -> Result<Vec<Prediction>> {
        let tsv = tesseract::run_tesseract_tsv(image_path, &self.languages, self.psm)?;
        let lines = parse::parse_tsv_lines(&tsv);
        debug!(
            "tesseract: {} line(s) in {}",
            lines.len(),
            image_path.display()
        );

        let mut texts = Vec::with_capacity(lines.len());
        let mut scores = Vec::with_capacity(lines.len());
        let mut polys = Vec::with_capacity(lines.len());
        for line in lines {
            polys.push(geom::bbox_polygon(&line.bbox));
            texts.push(line.text);
            scores.push(line.conf);
        }
        Ok(vec![Prediction {
            rec_texts: Some(texts),
            rec_scores: Some(scores),
            dt_polys: Some(polys),
        }])
    }
}
