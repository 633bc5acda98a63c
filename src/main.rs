use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::Level;

use ocr_annotator::{logging, ocr, report, server, settings};

#[derive(Parser, Debug)]
#[command(
    name = "ocr-annotator",
    version,
    about = "Extract text from images and PDFs and draw the detected regions"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the upload web page
    Serve {
        /// Listen address (overrides [server] addr)
        #[arg(long = "addr")]
        addr: Option<String>,
    },
    /// OCR one image or PDF and write the annotated output next to it
    Scan {
        /// Image (png/jpg/jpeg/bmp) or PDF to process
        input: PathBuf,

        /// Output directory (default: the input's directory)
        #[arg(short = 'o', long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Show installed tesseract languages and exit
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match cli.command {
        Command::Serve { .. } => Level::INFO,
        _ => Level::WARN,
    };
    logging::init(cli.verbose, default_level)?;
    let mut settings = settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;

    match cli.command {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                settings.addr = addr;
            }
            server::run_server(settings).await
        }
        Command::Scan {
            input,
            out_dir,
            json,
        } => run_scan(&settings, &input, out_dir, json),
        Command::Languages => {
            for lang in ocr::list_tesseract_languages()? {
                println!("{}", lang);
            }
            Ok(())
        }
    }
}

fn run_scan(
    settings: &settings::Settings,
    input: &Path,
    out_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("input not found: {}", input.display()));
    }
    let out_dir = out_dir.unwrap_or_else(|| {
        input
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let pipeline = settings.build_pipeline()?;
    let results = pipeline.process(input, &out_dir)?;

    let mut text_files = Vec::with_capacity(results.len());
    for result in &results {
        text_files.push(report::write_text_report(result, &out_dir)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for (result, text_file) in results.iter().zip(&text_files) {
        print!("{}", report::format_result(result, text_file.as_deref()));
    }
    Ok(())
}
