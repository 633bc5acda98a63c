use anyhow::{Result, anyhow};
use std::path::Path;
use std::process::Command;
use tracing::warn;

use crate::tools::run_checked;

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let mut command = Command::new("tesseract");
    command.arg("--list-langs");
    let output = run_checked(command, "tesseract --list-langs")?;
    // tesseract prints a header line before the language list
    Ok(parse_language_list(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

pub(super) fn normalize_ocr_languages(requested: &str) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let available = match list_tesseract_languages() {
        Ok(list) => list,
        Err(_) => return Ok(split_languages(trimmed).join("+")),
    };
    select_languages(trimmed, &available)
}

fn split_languages(requested: &str) -> Vec<&str> {
    requested
        .split(['+', ',', ' '])
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .collect()
}

fn select_languages(requested: &str, available: &[String]) -> Result<String> {
    let (chosen, missing): (Vec<&str>, Vec<&str>) = split_languages(requested)
        .into_iter()
        .partition(|lang| available.iter().any(|value| value == lang));

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }
    Ok(chosen.join("+"))
}

pub(super) fn run_tesseract_tsv(path: &Path, languages: &str, psm: u32) -> Result<String> {
    let mut command = Command::new("tesseract");
    command
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--psm")
        .arg(psm.to_string())
        .arg("tsv");
    let output = run_checked(command, "tesseract")?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
