use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};
use tracing::debug;

use crate::tools::{first_available, run_checked};

/// PDF user space is 72 units per inch, so `scale × 72` is the render DPI.
const POINTS_PER_INCH: f32 = 72.0;

/// One rasterized page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number.
    pub index: usize,
    pub image: DynamicImage,
}

/// Lazy, single-pass sequence of pages in document order.
pub type Pages = Box<dyn Iterator<Item = Result<PageImage>> + Send>;

pub trait PageRasterizer: Send + Sync {
    /// Renders `pdf_path` at `scale` times its native page size.
    fn rasterize(&self, pdf_path: &Path, scale: f32) -> Result<Pages>;
}

/// Renders through `mutool draw` or `pdftoppm`, whichever is installed.
#[derive(Debug, Clone, Default)]
pub struct CommandRasterizer;

impl PageRasterizer for CommandRasterizer {
    fn rasterize(&self, pdf_path: &Path, scale: f32) -> Result<Pages> {
        Ok(Box::new(rasterize(pdf_path, scale)?))
    }
}

/// Pages rendered into a scratch directory, decoded one at a time as they are pulled.
///
/// The scratch directory lives as long as the iterator.
pub struct PageIter {
    _dir: TempDir,
    pages: std::vec::IntoIter<(usize, PathBuf)>,
}

impl Iterator for PageIter {
    type Item = Result<PageImage>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, path) = self.pages.next()?;
        Some(
            image::open(&path)
                .with_context(|| format!("failed to decode rendered pdf page {}", index))
                .map(|image| PageImage { index, image }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pages.size_hint()
    }
}

pub fn rasterize(pdf_path: &Path, scale: f32) -> Result<PageIter> {
    if !(scale > 0.0) {
        return Err(anyhow!("pdf scale must be positive (got {})", scale));
    }
    let dir = tempdir().with_context(|| "failed to create temp dir for pdf")?;
    let dpi = (POINTS_PER_INCH * scale).round().max(1.0) as u32;

    match first_available(&["mutool", "pdftoppm"]) {
        Some("mutool") => {
            let mut command = Command::new("mutool");
            command
                .arg("draw")
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-o")
                .arg(dir.path().join("page-%d.png"))
                .arg(pdf_path);
            run_checked(command, "mutool")?;
        }
        Some(program) => {
            let mut command = Command::new(program);
            command
                .arg("-png")
                .arg("-r")
                .arg(dpi.to_string())
                .arg(pdf_path)
                .arg(dir.path().join("page"));
            run_checked(command, program)?;
        }
        None => {
            return Err(anyhow!(
                "pdf rendering requires mutool or pdftoppm (install mupdf or poppler)"
            ));
        }
    }

    let pages = collect_page_files(dir.path())?;
    debug!(
        "rendered {} page(s) from {} at {} dpi",
        pages.len(),
        pdf_path.display(),
        dpi
    );
    Ok(PageIter {
        _dir: dir,
        pages: pages.into_iter(),
    })
}

/// `page-N.png` / `page-0N.png` files in `dir`, ordered by page number.
fn collect_page_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let mut pages = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| "failed to read temp pdf directory")?;
    for entry in entries {
        let path = entry.with_context(|| "failed to read temp pdf entry")?.path();
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages)
}

fn page_number(path: &Path) -> Option<usize> {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if !is_png {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}
