use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use super::upload::ALLOWED_EXTENSIONS;
use crate::pipeline::DetectionResult;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");

pub(super) fn render_index(
    flash: Option<&str>,
    results: Option<&[DetectionResult]>,
) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("flash", &flash);
    context.insert("results", &results);
    let accept = ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");
    context.insert("accept", &accept);
    Tera::one_off(INDEX_TEMPLATE, &context, true).with_context(|| "failed to render index page")
}
