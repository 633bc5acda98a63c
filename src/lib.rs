//! Upload an image or PDF, run it through an OCR engine and get back the recognized text
//! plus a copy of each image with the detected regions outlined and labelled.

pub mod logging;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;
mod tools;

pub use pipeline::{DetectionResult, LineSummary, Pipeline};
