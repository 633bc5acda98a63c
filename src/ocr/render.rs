use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GenericImageView, RgbImage};
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use super::font::LabelFont;
use super::{BoundingPolygon, Point};

/// Labels sit this many pixels above their anchor vertex.
pub const LABEL_OFFSET_Y: f32 = 25.0;

const DEFAULT_FONT_SIZE: f32 = 20.0;
const DEFAULT_COLOR: &str = "#ff0000";

#[derive(Debug, Clone)]
pub struct LabelStyle {
    pub font: LabelFont,
    pub font_size: f32,
    /// Used for both outlines and label text.
    pub color: String,
}

impl LabelStyle {
    pub fn new(font: LabelFont) -> Self {
        Self {
            font,
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

/// The vertex with the smallest `x + y`; the first one wins a tie.
///
/// For rotated boxes this is only the visually top-left-most corner, not necessarily the
/// true top-left.
pub fn label_anchor(polygon: &BoundingPolygon) -> Option<Point> {
    polygon
        .vertices
        .iter()
        .copied()
        .fold(None, |best: Option<Point>, point| match best {
            Some(current) if current.x + current.y <= point.x + point.y => Some(current),
            _ => Some(point),
        })
}

pub fn format_label(text: &str, score: f32) -> String {
    format!("{} ({:.2})", text, score)
}

/// SVG elements for every `(polygon, text, score)` triple, in input order.
///
/// Extra entries in the longer slices are ignored. Nothing is clipped: a label anchored
/// less than [`LABEL_OFFSET_Y`] pixels from the top edge lands partly off-canvas.
pub fn overlay_markup(
    polygons: &[BoundingPolygon],
    texts: &[String],
    scores: &[f32],
    style: &LabelStyle,
) -> String {
    let mut svg = String::new();
    let baseline_shift = style.font.ascender() * style.font_size;
    for ((polygon, text), score) in polygons.iter().zip(texts).zip(scores) {
        let Some(anchor) = label_anchor(polygon) else {
            continue;
        };
        let points = polygon
            .vertices
            .iter()
            .map(|point| format!("{},{}", point.x, point.y))
            .collect::<Vec<_>>()
            .join(" ");
        svg.push_str(&format!(
            r#"<polygon points="{points}" fill="none" stroke="{color}" stroke-width="1" shape-rendering="crispEdges"/>"#,
            points = points,
            color = escape_xml(&style.color)
        ));
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" font-family="{family}" fill="{color}" xml:space="preserve">{label}</text>"#,
            x = anchor.x,
            y = (anchor.y - LABEL_OFFSET_Y + baseline_shift).round(),
            size = style.font_size,
            family = escape_xml(style.font.family()),
            color = escape_xml(&style.color),
            label = escape_xml(&format_label(text, *score))
        ));
    }
    svg
}

/// Draws outlines and labels onto a copy of `image`.
///
/// The output depends only on the inputs and the resolved font, so identical calls produce
/// identical pixels.
pub fn annotate(
    image: &DynamicImage,
    polygons: &[BoundingPolygon],
    texts: &[String],
    scores: &[f32],
    style: &LabelStyle,
) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .with_context(|| "failed to encode source image")?;
    let data_uri = format!("data:image/png;base64,{}", BASE64.encode(&png));

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));
    svg.push_str(&overlay_markup(polygons, texts, scores, style));
    svg.push_str("</svg>");

    rasterize_svg(&svg, &style.font)
}

fn rasterize_svg(svg: &str, font: &LabelFont) -> Result<RgbImage> {
    let mut db = fontdb::Database::new();
    db.load_font_data(font.data().to_vec());
    db.set_sans_serif_family(font.family());
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let rgba = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.take())
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;
    Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn square(offset: f32) -> BoundingPolygon {
        BoundingPolygon::new(vec![
            Point::new(offset, offset),
            Point::new(offset + 10.0, offset),
            Point::new(offset + 10.0, offset + 10.0),
            Point::new(offset, offset + 10.0),
        ])
    }

    fn style() -> LabelStyle {
        LabelStyle::new(LabelFont::builtin())
    }

    #[test]
    fn anchor_of_square_is_origin() {
        assert_eq!(label_anchor(&square(0.0)), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn anchor_prefers_first_vertex_on_tie() {
        let polygon = BoundingPolygon::new(vec![
            Point::new(5.0, 1.0),
            Point::new(1.0, 5.0),
            Point::new(9.0, 9.0),
        ]);
        assert_eq!(label_anchor(&polygon), Some(Point::new(5.0, 1.0)));
        assert_eq!(label_anchor(&BoundingPolygon::new(Vec::new())), None);
    }

    #[test]
    fn label_has_two_decimal_score() {
        assert_eq!(format_label("Total", 0.987), "Total (0.99)");
        assert_eq!(format_label("x", 1.0), "x (1.00)");
    }

    #[test]
    fn overlay_markup_places_label_above_anchor() {
        let style = style();
        let markup = overlay_markup(&[square(0.0)], &["Total".to_string()], &[0.987], &style);
        let baseline = (style.font.ascender() * style.font_size - LABEL_OFFSET_Y).round();
        assert_eq!(
            markup,
            format!(
                r##"<polygon points="0,0 10,0 10,10 0,10" fill="none" stroke="#ff0000" stroke-width="1" shape-rendering="crispEdges"/><text x="0" y="{}" font-size="20" font-family="DejaVu Sans" fill="#ff0000" xml:space="preserve">Total (0.99)</text>"##,
                baseline
            )
        );
    }

    #[test]
    fn overlay_markup_escapes_and_zips_shortest() {
        let markup = overlay_markup(
            &[square(0.0), square(40.0)],
            &["a<b".to_string()],
            &[0.5, 0.25],
            &style(),
        );
        assert_eq!(markup.matches("<polygon").count(), 1);
        assert!(markup.contains("a&lt;b (0.50)"));
    }

    #[test]
    fn annotate_draws_outline_and_is_stable() {
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])));
        let polygons = vec![square(10.0)];
        let texts = vec!["".to_string()];
        let scores = vec![0.5];

        let first = annotate(&base, &polygons, &texts, &scores, &style()).expect("annotate");
        let second = annotate(&base, &polygons, &texts, &scores, &style()).expect("annotate");
        assert_eq!(first.dimensions(), (40, 40));
        assert_eq!(first.as_raw(), second.as_raw());
        assert_eq!(*first.get_pixel(0, 39), Rgb([255, 255, 255]));
        let outline_touched = (9..=11).any(|x| first.get_pixel(x, 15)[1] < 200);
        assert!(outline_touched, "expected a red outline near x=10");
    }

    /// Red-ish pixels in the label band above a small box at (10, 40), right of the box.
    fn label_pixels(font: LabelFont) -> usize {
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(220, 80, Rgb([255, 255, 255])));
        let polygon = BoundingPolygon::new(vec![
            Point::new(10.0, 40.0),
            Point::new(20.0, 40.0),
            Point::new(20.0, 50.0),
            Point::new(10.0, 50.0),
        ]);
        let annotated = annotate(
            &base,
            &[polygon],
            &["WWWWWW".to_string()],
            &[0.5],
            &LabelStyle::new(font),
        )
        .expect("annotate");
        let top = (40.0 - LABEL_OFFSET_Y) as u32;
        (top..40)
            .flat_map(|y| (25..220).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let pixel = annotated.get_pixel(x, y);
                pixel[0] > 150 && pixel[1] < 128 && pixel[2] < 128
            })
            .count()
    }

    #[test]
    fn builtin_font_draws_label_text() {
        assert!(label_pixels(LabelFont::builtin()) > 50);
    }

    #[test]
    fn resolved_fallback_font_draws_label_text() {
        let font = crate::ocr::resolve_label_font(None, crate::ocr::FALLBACK_FONT_PATHS);
        assert!(label_pixels(font) > 50);
    }
}
