use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use ttf_parser::{Face, name_id};
use usvg::fontdb;

/// Fonts tried, in order, when the requested label font cannot be loaded.
pub const FALLBACK_FONT_PATHS: &[&str] = &[
    r"C:\Windows\Fonts\arial.ttf",
    r"C:\Windows\Fonts\calibri.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Families asked of the system font database, in order, before the embedded font is used.
const SYSTEM_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Noto Sans", "FreeSans"];

const BUILTIN_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BUILTIN_FAMILY: &str = "DejaVu Sans";
const BUILTIN_ASCENDER: f32 = 0.8;

#[derive(Debug, Clone)]
enum FontOrigin {
    File(PathBuf),
    System,
    Builtin,
}

/// The font labels are drawn with.
///
/// Always carries real font data, so the renderer never depends on what the host has
/// installed at render time.
#[derive(Clone)]
pub struct LabelFont {
    origin: FontOrigin,
    data: Arc<Vec<u8>>,
    family: String,
    ascender: f32,
}

impl LabelFont {
    /// DejaVu Sans, compiled into the binary.
    pub fn builtin() -> Self {
        let (family, ascender) = match Face::parse(BUILTIN_FONT, 0) {
            Ok(face) => (
                extract_family_name(&face).unwrap_or_else(|| BUILTIN_FAMILY.to_string()),
                face_ascender(&face),
            ),
            Err(_) => (BUILTIN_FAMILY.to_string(), BUILTIN_ASCENDER),
        };
        Self {
            origin: FontOrigin::Builtin,
            data: Arc::new(BUILTIN_FONT.to_vec()),
            family,
            ascender,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        Self::from_data(data, 0, FontOrigin::File(path.to_path_buf()))
            .with_context(|| format!("failed to parse font: {}", path.display()))
    }

    /// First sans-serif face the system font database can provide.
    pub fn system_sans_serif() -> Option<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let mut families = vec![fontdb::Family::SansSerif];
        families.extend(SYSTEM_FAMILIES.iter().map(|name| fontdb::Family::Name(name)));
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };
        let id = db.query(&query)?;
        let (data, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        match Self::from_data(data, index, FontOrigin::System) {
            Ok(font) => Some(font),
            Err(err) => {
                debug!("system font rejected: {:#}", err);
                None
            }
        }
    }

    fn from_data(data: Vec<u8>, index: u32, origin: FontOrigin) -> Result<Self> {
        let face = Face::parse(&data, index).map_err(|err| anyhow!("{}", err))?;
        let ascender = face_ascender(&face);
        let family = extract_family_name(&face)
            .ok_or_else(|| anyhow!("font has no family name"))?;
        Ok(Self {
            origin,
            data: Arc::new(data),
            family,
            ascender,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Distance from the top of the text box to the baseline, as a fraction of font size.
    pub fn ascender(&self) -> f32 {
        self.ascender
    }

    /// Where the font came from, for logs.
    pub fn source(&self) -> String {
        match &self.origin {
            FontOrigin::File(path) => path.display().to_string(),
            FontOrigin::System => "system".to_string(),
            FontOrigin::Builtin => "built-in".to_string(),
        }
    }
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont")
            .field("origin", &self.origin)
            .field("family", &self.family)
            .field("ascender", &self.ascender)
            .finish()
    }
}

/// Requested font, then each of `fallback`, then the system sans-serif, then the embedded
/// DejaVu Sans. Never fails.
pub fn resolve_label_font(requested: Option<&Path>, fallback: &[&str]) -> LabelFont {
    resolve_with(requested, fallback, LabelFont::system_sans_serif)
}

fn resolve_with(
    requested: Option<&Path>,
    fallback: &[&str],
    system: impl FnOnce() -> Option<LabelFont>,
) -> LabelFont {
    if let Some(path) = requested {
        match LabelFont::from_file(path) {
            Ok(font) => return font,
            Err(err) => debug!("label font unavailable: {:#}", err),
        }
    }
    for candidate in fallback {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match LabelFont::from_file(path) {
            Ok(font) => return font,
            Err(err) => debug!("fallback font rejected: {:#}", err),
        }
    }
    if let Some(font) = system() {
        debug!("label font from system: {}", font.family());
        return font;
    }
    warn!("no label font found, using the built-in {}", BUILTIN_FAMILY);
    LabelFont::builtin()
}

fn face_ascender(face: &Face<'_>) -> f32 {
    let units = face.units_per_em().max(1) as f32;
    face.ascender() as f32 / units
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_fonts_fall_back_to_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").expect("write");
        let bogus_str = bogus.to_string_lossy().to_string();

        let font = resolve_with(
            Some(&dir.path().join("missing.ttf")),
            &[bogus_str.as_str(), "/nonexistent/font.ttf"],
            || None,
        );
        assert_eq!(font.family(), "DejaVu Sans");
        assert_eq!(font.source(), "built-in");
    }

    #[test]
    fn system_font_is_tried_before_builtin() {
        let font = resolve_with(None, &[], || {
            let mut font = LabelFont::builtin();
            font.origin = FontOrigin::System;
            Some(font)
        });
        assert_eq!(font.source(), "system");
    }

    #[test]
    fn builtin_font_carries_real_metrics() {
        let font = LabelFont::builtin();
        assert!(Face::parse(font.data(), 0).is_ok());
        assert!(font.ascender() > 0.5 && font.ascender() < 1.2);
    }

    #[test]
    fn font_file_is_loaded_with_its_family() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("label.ttf");
        std::fs::write(&path, BUILTIN_FONT).expect("write");
        let font = resolve_with(Some(&path), &[], || None);
        assert_eq!(font.family(), "DejaVu Sans");
        assert_eq!(font.source(), path.display().to_string());
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"nope").expect("write");
        let err = LabelFont::from_file(&bogus).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse font"));
    }
}
