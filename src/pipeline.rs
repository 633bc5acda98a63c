use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::ocr::{self, Extraction, LabelStyle, OcrEngine, RecognizedLines};
use crate::pdf::{CommandRasterizer, PageRasterizer};

/// Upscaling applied to PDF pages before OCR; small print recognizes better at 2×.
pub const DEFAULT_PDF_SCALE: f32 = 2.0;

const ANNOTATED_SUFFIX: &str = "_annotated";

/// Outcome for one image or one PDF page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub success: bool,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// File name of the annotated image inside the output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_path: Option<PathBuf>,
    pub lines: Vec<LineSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub text: String,
    pub score: f32,
}

impl DetectionResult {
    fn succeeded(filename: String, lines: &RecognizedLines, annotated_path: PathBuf) -> Self {
        let annotated_image = annotated_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string());
        Self {
            success: true,
            filename,
            text: Some(lines.joined_text()),
            annotated_image,
            annotated_path: Some(annotated_path),
            lines: lines
                .texts()
                .iter()
                .zip(lines.scores())
                .map(|(text, score)| LineSummary {
                    text: text.clone(),
                    score: *score,
                })
                .collect(),
            error: None,
        }
    }

    fn failed(filename: String, error: &str) -> Self {
        Self {
            success: false,
            filename,
            text: None,
            annotated_image: None,
            annotated_path: None,
            lines: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// File-to-results pipeline.
///
/// Built once and shared; every collaborator is injected so nothing here is global.
pub struct Pipeline {
    engine: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn PageRasterizer>,
    style: LabelStyle,
    pdf_scale: f32,
}

impl Pipeline {
    pub fn new(engine: Arc<dyn OcrEngine>, style: LabelStyle) -> Self {
        Self {
            engine,
            rasterizer: Arc::new(CommandRasterizer),
            style,
            pdf_scale: DEFAULT_PDF_SCALE,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_pdf_scale(mut self, scale: f32) -> Self {
        self.pdf_scale = scale;
        self
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    pub fn style(&self) -> &LabelStyle {
        &self.style
    }

    /// Runs OCR on an image or on every page of a PDF.
    ///
    /// Writes `<stem>_page_<n>.png` for each PDF page and `<stem>_annotated.png` for each
    /// image with detected text into `output_dir`, overwriting earlier files of the same
    /// name. Any engine or IO failure aborts the whole file.
    pub fn process(&self, file_path: &Path, output_dir: &Path) -> Result<Vec<DetectionResult>> {
        std::fs::create_dir_all(output_dir).with_context(|| {
            format!("failed to create output dir: {}", output_dir.display())
        })?;
        if !is_pdf(file_path) {
            info!("processing image {}", file_path.display());
            return Ok(vec![self.process_image(file_path, output_dir)?]);
        }

        info!("processing pdf {}", file_path.display());
        let base_name = file_stem(file_path);
        let mut results = Vec::new();
        for page in self.rasterizer.rasterize(file_path, self.pdf_scale)? {
            let page = page?;
            let page_path = output_dir.join(format!("{}_page_{}.png", base_name, page.index));
            page.image
                .save_with_format(&page_path, image::ImageFormat::Png)
                .with_context(|| format!("failed to write page image: {}", page_path.display()))?;
            results.push(self.process_image(&page_path, output_dir)?);
        }
        if results.is_empty() {
            return Err(anyhow!("no pages found in pdf: {}", file_path.display()));
        }
        Ok(results)
    }

    /// OCR + annotation for a single image file.
    pub fn process_image(&self, image_path: &Path, output_dir: &Path) -> Result<DetectionResult> {
        let filename = image_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let lines = match ocr::extract(self.engine.as_ref(), image_path)? {
            Extraction::Lines(lines) => lines,
            Extraction::Malformed => {
                return Ok(DetectionResult::failed(filename, ocr::MALFORMED_MESSAGE));
            }
        };

        let image = image::open(image_path)
            .with_context(|| format!("failed to open image: {}", image_path.display()))?;
        let annotated = ocr::annotate(
            &image,
            lines.polygons(),
            lines.texts(),
            lines.scores(),
            &self.style,
        )?;
        let annotated_path =
            output_dir.join(format!("{}{}.png", file_stem(image_path), ANNOTATED_SUFFIX));
        annotated
            .save_with_format(&annotated_path, image::ImageFormat::Png)
            .with_context(|| {
                format!("failed to write annotated image: {}", annotated_path.display())
            })?;
        info!(
            "{}: {} line(s) -> {}",
            filename,
            lines.len(),
            annotated_path.display()
        );
        Ok(DetectionResult::succeeded(filename, &lines, annotated_path))
    }
}

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_detection_ignores_case() {
        assert!(is_pdf(Path::new("scan.PDF")));
        assert!(is_pdf(Path::new("dir/scan.pdf")));
        assert!(!is_pdf(Path::new("scan.pdf.png")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn failed_results_omit_success_fields() {
        let result = DetectionResult::failed("a.png".to_string(), ocr::MALFORMED_MESSAGE);
        insta::assert_json_snapshot!(result, @r#"
        {
          "success": false,
          "filename": "a.png",
          "lines": [],
          "error": "No text detected or unexpected result structure."
        }
        "#);
    }
}
