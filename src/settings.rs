use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ocr::{self, CommandEngine, LabelStyle, OcrEngine, TesseractEngine};
use crate::pipeline::{DEFAULT_PDF_SCALE, Pipeline};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineKind {
    Tesseract,
    Command,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: String,
    pub uploads_dir: PathBuf,
    pub results_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub engine: EngineKind,
    pub ocr_languages: String,
    pub ocr_command: Vec<String>,
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    pub label_color: String,
    pub pdf_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            uploads_dir: PathBuf::from("static/uploads"),
            results_dir: PathBuf::from("static/results"),
            max_upload_bytes: 32 * 1024 * 1024,
            engine: EngineKind::Tesseract,
            ocr_languages: "fra".to_string(),
            ocr_command: Vec::new(),
            font_path: None,
            font_size: 20.0,
            label_color: "#ff0000".to_string(),
            pdf_scale: DEFAULT_PDF_SCALE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    ocr: Option<OcrSettings>,
    render: Option<RenderSettings>,
    pdf: Option<PdfSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    uploads_dir: Option<String>,
    results_dir: Option<String>,
    max_upload_mb: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    engine: Option<String>,
    languages: Option<String>,
    command: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    font_path: Option<String>,
    font_size: Option<f32>,
    color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfSettings {
    scale: Option<f32>,
}

/// Embedded defaults, then `./settings.toml`, `./settings.local.toml`, then `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge_str(DEFAULT_SETTINGS_TOML, "embedded settings.toml")?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_str(&content, &path.display().to_string())?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge_str(&mut self, content: &str, origin: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)
            .with_context(|| format!("failed to parse settings: {}", origin))?;
        self.merge(parsed)
            .with_context(|| format!("invalid settings: {}", origin))
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(server) = incoming.server {
            if let Some(addr) = non_empty(server.addr) {
                self.addr = addr;
            }
            if let Some(dir) = non_empty(server.uploads_dir) {
                self.uploads_dir = PathBuf::from(dir);
            }
            if let Some(dir) = non_empty(server.results_dir) {
                self.results_dir = PathBuf::from(dir);
            }
            if let Some(limit) = server.max_upload_mb {
                if limit > 0 {
                    self.max_upload_bytes = limit * 1024 * 1024;
                }
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(engine) = non_empty(ocr.engine) {
                self.engine = match engine.to_ascii_lowercase().as_str() {
                    "tesseract" => EngineKind::Tesseract,
                    "command" => EngineKind::Command,
                    other => return Err(anyhow!("unknown ocr engine '{}'", other)),
                };
            }
            if let Some(languages) = non_empty(ocr.languages) {
                self.ocr_languages = languages;
            }
            if let Some(command) = ocr.command {
                if !command.is_empty() {
                    self.ocr_command = command;
                }
            }
        }
        if let Some(render) = incoming.render {
            if let Some(path) = non_empty(render.font_path) {
                self.font_path = Some(PathBuf::from(path));
            }
            if let Some(size) = render.font_size {
                if size > 0.0 {
                    self.font_size = size;
                }
            }
            if let Some(color) = non_empty(render.color) {
                self.label_color = color;
            }
        }
        if let Some(pdf) = incoming.pdf {
            if let Some(scale) = pdf.scale {
                if scale > 0.0 {
                    self.pdf_scale = scale;
                }
            }
        }
        Ok(())
    }

    pub fn build_engine(&self) -> Result<Arc<dyn OcrEngine>> {
        let engine: Arc<dyn OcrEngine> = match self.engine {
            EngineKind::Tesseract => Arc::new(TesseractEngine::new(&self.ocr_languages)?),
            EngineKind::Command => Arc::new(CommandEngine::from_argv(&self.ocr_command)?),
        };
        Ok(engine)
    }

    pub fn label_style(&self) -> LabelStyle {
        let font = ocr::resolve_label_font(self.font_path.as_deref(), ocr::FALLBACK_FONT_PATHS);
        LabelStyle {
            font,
            font_size: self.font_size,
            color: self.label_color.clone(),
        }
    }

    /// The engine is constructed here, once, and owned by the returned pipeline.
    pub fn build_pipeline(&self) -> Result<Pipeline> {
        let engine = self.build_engine()?;
        Ok(Pipeline::new(engine, self.label_style()).with_pdf_scale(self.pdf_scale))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
