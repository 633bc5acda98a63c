use std::collections::HashMap;

use super::geom::{BBoxPx, union_bbox};

/// A recognized line assembled from tesseract's word rows.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct TsvLine {
    pub(super) text: String,
    pub(super) bbox: BBoxPx,
    /// Character-weighted mean confidence in `[0, 1]`.
    pub(super) conf: f32,
}

struct LineBuilder {
    text: String,
    bbox: BBoxPx,
    conf_sum: f32,
    chars: usize,
}

impl LineBuilder {
    fn new(word: &str, bbox: BBoxPx, conf: f32) -> Self {
        let chars = word.chars().count().max(1);
        Self {
            text: word.to_string(),
            bbox,
            conf_sum: conf * chars as f32,
            chars,
        }
    }

    fn push(&mut self, word: &str, bbox: BBoxPx, conf: f32) {
        if needs_space(&self.text, word) {
            self.text.push(' ');
        }
        self.text.push_str(word);
        self.bbox = union_bbox(&self.bbox, &bbox);
        let chars = word.chars().count().max(1);
        self.conf_sum += conf * chars as f32;
        self.chars += chars;
    }

    fn finish(self) -> TsvLine {
        let conf = (self.conf_sum / self.chars.max(1) as f32 / 100.0).clamp(0.0, 1.0);
        TsvLine {
            text: self.text,
            bbox: self.bbox,
            conf,
        }
    }
}

/// Groups `tesseract ... tsv` word rows (level 5) into lines.
///
/// Lines come out in the order tesseract first reports them and words keep their row order,
/// so nothing is re-sorted here.
pub(super) fn parse_tsv_lines(tsv: &str) -> Vec<TsvLine> {
    let mut order: Vec<(i32, i32, i32, i32)> = Vec::new();
    let mut builders: HashMap<(i32, i32, i32, i32), LineBuilder> = HashMap::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let key = (
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        let bbox = BBoxPx {
            x: cols[6].parse().unwrap_or(0),
            y: cols[7].parse().unwrap_or(0),
            w: cols[8].parse().unwrap_or(0),
            h: cols[9].parse().unwrap_or(0),
        };

        match builders.get_mut(&key) {
            Some(builder) => builder.push(text, bbox, conf),
            None => {
                order.push(key);
                builders.insert(key, LineBuilder::new(text, bbox, conf));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| builders.remove(&key))
        .map(LineBuilder::finish)
        .collect()
}

fn needs_space(left: &str, right: &str) -> bool {
    let last = left.chars().rev().find(|ch| !ch.is_whitespace());
    let first = right.chars().find(|ch| !ch.is_whitespace());
    match (last, first) {
        (Some(a), Some(b)) => !(is_cjk(a) && is_cjk(b)),
        _ => false,
    }
}

fn is_cjk(ch: char) -> bool {
    matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xAC00..=0xD7AF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: i32, line: i32, word: i32, left: u32, conf: &str, text: &str) -> String {
        format!("5\t1\t{block}\t1\t{line}\t{word}\t{left}\t{top}\t30\t12\t{conf}\t{text}", top = 10 * line)
    }

    #[test]
    fn groups_words_into_lines_in_report_order() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t200\t100\t-1\t".to_string(),
            word(2, 1, 1, 0, "90", "Bonjour"),
            word(1, 1, 1, 0, "80", "Premier"),
            word(2, 1, 2, 40, "70", "monde"),
            word(1, 2, 1, 0, "-1", ""),
        ]
        .join("\n");

        let lines = parse_tsv_lines(&tsv);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Bonjour monde");
        assert_eq!(lines[1].text, "Premier");
        assert_eq!(lines[0].bbox, BBoxPx { x: 0, y: 10, w: 70, h: 12 });
    }

    #[test]
    fn confidence_is_char_weighted_and_normalized() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 0, "100", "abc"),
            word(1, 1, 2, 40, "50", "d"),
        ]
        .join("\n");
        let lines = parse_tsv_lines(&tsv);
        assert_eq!(lines.len(), 1);
        assert!((lines[0].conf - 0.875).abs() < 1e-6);
    }

    #[test]
    fn cjk_words_join_without_space() {
        assert!(!needs_space("日本", "語"));
        assert!(needs_space("hello", "world"));
        assert!(needs_space("prix:", "12€"));
    }
}
