use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::pipeline::DetectionResult;

const TEXT_SUFFIX: &str = "_text.txt";

/// `<stem>_text.txt` next to the annotated images.
pub fn text_report_path(result: &DetectionResult, out_dir: &Path) -> PathBuf {
    let stem = Path::new(&result.filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    out_dir.join(format!("{}{}", stem, TEXT_SUFFIX))
}

/// Writes one recognized line per row. Failed results produce no file.
pub fn write_text_report(result: &DetectionResult, out_dir: &Path) -> Result<Option<PathBuf>> {
    if !result.success {
        return Ok(None);
    }
    let path = text_report_path(result, out_dir);
    let mut content = String::new();
    for line in &result.lines {
        content.push_str(&line.text);
        content.push('\n');
    }
    std::fs::write(&path, content)
        .with_context(|| format!("failed to write text file: {}", path.display()))?;
    Ok(Some(path))
}

/// Human-readable summary for the terminal.
pub fn format_result(result: &DetectionResult, text_file: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", result.filename);
    if !result.success {
        let _ = writeln!(
            out,
            "  error: {}",
            result.error.as_deref().unwrap_or_default()
        );
        return out;
    }
    let _ = writeln!(out, "  detected text:");
    for line in &result.lines {
        let _ = writeln!(
            out,
            "  - {} (confidence: {:.2}%)",
            line.text,
            line.score * 100.0
        );
    }
    if let Some(path) = &result.annotated_path {
        let _ = writeln!(out, "  annotated image: {}", path.display());
    }
    if let Some(path) = text_file {
        let _ = writeln!(out, "  text file: {}", path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LineSummary;

    fn success() -> DetectionResult {
        DetectionResult {
            success: true,
            filename: "promenade.png".to_string(),
            text: Some("Promenade\nsoudaine".to_string()),
            annotated_image: Some("promenade_annotated.png".to_string()),
            annotated_path: Some(PathBuf::from("out/promenade_annotated.png")),
            lines: vec![
                LineSummary {
                    text: "Promenade".to_string(),
                    score: 0.5,
                },
                LineSummary {
                    text: "soudaine".to_string(),
                    score: 0.25,
                },
            ],
            error: None,
        }
    }

    #[test]
    fn text_report_has_one_line_per_detection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_text_report(&success(), dir.path())
            .expect("write")
            .expect("path");
        assert_eq!(path, dir.path().join("promenade_text.txt"));
        assert_eq!(
            std::fs::read_to_string(path).expect("read"),
            "Promenade\nsoudaine\n"
        );
    }

    #[test]
    fn failures_write_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let failed = DetectionResult {
            success: false,
            text: None,
            annotated_image: None,
            annotated_path: None,
            lines: Vec::new(),
            error: Some("nothing".to_string()),
            ..success()
        };
        assert_eq!(write_text_report(&failed, dir.path()).expect("write"), None);
        assert_eq!(format_result(&failed, None), "promenade.png\n  error: nothing\n");
    }

    #[test]
    fn summary_lists_confidence_percentages() {
        let summary = format_result(&success(), Some(Path::new("out/promenade_text.txt")));
        insta::assert_snapshot!(summary, @r"
        promenade.png
          detected text:
          - Promenade (confidence: 50.00%)
          - soudaine (confidence: 25.00%)
          annotated image: out/promenade_annotated.png
          text file: out/promenade_text.txt
        ");
    }
}
