use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Command;

use super::{OcrEngine, Prediction};
use crate::tools::run_checked;

/// Delegates OCR to an external program.
///
/// The program is invoked as `<program> <args...> <image>` and must print a JSON array of
/// predictions (`rec_texts`, `rec_scores`, `dt_polys`) on stdout. This is how a PaddleOCR
/// helper script is plugged in.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    /// Builds an engine from `[program, args...]`.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("ocr command is empty"))?;
        if program.trim().is_empty() {
            return Err(anyhow!("ocr command is empty"));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl OcrEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn predict(&self, image_path: &Path) -> Result<Vec<Prediction>> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(image_path);
        let output = run_checked(command, &self.program)?;
        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("failed to parse {} output as predictions", self.program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argv_is_rejected() {
        assert!(CommandEngine::from_argv(&[]).is_err());
        assert!(CommandEngine::from_argv(&["  ".to_string()]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn parses_program_stdout() {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"echo '[{"rec_texts":["hi"],"rec_scores":[0.9],"dt_polys":[[[0,0],[4,0],[4,2],[0,2]]]}]'"#
                .to_string(),
        ];
        let engine = CommandEngine::from_argv(&argv).expect("engine");
        let predictions = engine.predict(Path::new("ignored.png")).expect("predict");
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].rec_texts.as_deref(), Some(&["hi".to_string()][..]));
    }
}
