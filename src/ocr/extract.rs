use anyhow::Result;
use std::path::Path;
use tracing::{debug, warn};

use super::engine::{OcrEngine, Prediction};
use super::BoundingPolygon;

/// Diagnostic attached to every result whose engine output could not be used.
pub const MALFORMED_MESSAGE: &str = "No text detected or unexpected result structure.";

/// Positionally aligned recognition output: index `i` of each vector is the same line.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLines {
    texts: Vec<String>,
    scores: Vec<f32>,
    polygons: Vec<BoundingPolygon>,
}

impl RecognizedLines {
    /// Returns `None` unless all three vectors have the same length.
    pub fn new(
        texts: Vec<String>,
        scores: Vec<f32>,
        polygons: Vec<BoundingPolygon>,
    ) -> Option<Self> {
        if texts.len() != scores.len() || texts.len() != polygons.len() {
            return None;
        }
        Some(Self {
            texts,
            scores,
            polygons,
        })
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn polygons(&self) -> &[BoundingPolygon] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Recognized strings joined by newlines, in engine order.
    pub fn joined_text(&self) -> String {
        self.texts.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Lines(RecognizedLines),
    /// Empty output, a missing field, misaligned fields or no detected line.
    Malformed,
}

impl Extraction {
    pub fn from_predictions(predictions: Vec<Prediction>) -> Self {
        let Some(first) = predictions.into_iter().next() else {
            return Extraction::Malformed;
        };
        let Prediction {
            rec_texts: Some(texts),
            rec_scores: Some(scores),
            dt_polys: Some(polygons),
        } = first
        else {
            return Extraction::Malformed;
        };
        match RecognizedLines::new(texts, scores, polygons) {
            Some(lines) if !lines.is_empty() => Extraction::Lines(lines),
            _ => Extraction::Malformed,
        }
    }
}

/// Runs `engine` on one image and checks the shape of what comes back.
///
/// Engine failures are returned as errors untouched; only the shape check is turned into
/// [`Extraction::Malformed`].
pub fn extract(engine: &dyn OcrEngine, image_path: &Path) -> Result<Extraction> {
    let predictions = engine.predict(image_path)?;
    let extraction = Extraction::from_predictions(predictions);
    match &extraction {
        Extraction::Lines(lines) => debug!(
            "{}: {} line(s) from {}",
            engine.name(),
            lines.len(),
            image_path.display()
        ),
        Extraction::Malformed => warn!(
            "{}: unusable result for {}",
            engine.name(),
            image_path.display()
        ),
    }
    Ok(extraction)
}
