use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, warn};

use crate::engine::segment::PAGE_BREAK;
use crate::util::{read_text_if_present, sanitize_client_name};

const RASTER_DPI: &str = "300";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TextOrigin {
    Sidecar,
    Ocr,
    TextLayer,
}

impl TextOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sidecar => "sidecar",
            Self::Ocr => "ocr",
            Self::TextLayer => "text_layer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    pub origin: TextOrigin,
    pub page_count: usize,
    pub warnings: Vec<String>,
}

impl SourceText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Text for one source PDF. A `.txt` file next to the PDF wins; otherwise
/// every page is rasterized and run through tesseract.
pub fn read_source_text(pdf_path: &Path, ocr_lang: &str) -> Result<SourceText> {
    let sidecar = pdf_path.with_extension("txt");
    if let Some(text) = read_text_if_present(&sidecar)? {
        debug!(path = %sidecar.display(), "using text sidecar");
        let page_count = text.matches(PAGE_BREAK).count() + 1;
        return Ok(SourceText {
            text,
            origin: TextOrigin::Sidecar,
            page_count,
            warnings: Vec::new(),
        });
    }

    let layer = text_layer_pages(pdf_path)?;
    if !ocr_tools_present() {
        let message = format!(
            "pdftoppm/tesseract not installed; falling back to the text layer of {}",
            pdf_path.display()
        );
        warn!("{message}");
        return Ok(SourceText {
            text: join_pages(&layer),
            origin: TextOrigin::TextLayer,
            page_count: layer.len(),
            warnings: vec![message],
        });
    }

    let mut pages = Vec::with_capacity(layer.len());
    let mut warnings = Vec::new();
    for (index, layer_text) in layer.iter().enumerate() {
        let page = index + 1;
        match ocr_page(pdf_path, page, ocr_lang) {
            Ok(text) => pages.push(text),
            Err(error) => {
                let message = format!(
                    "page {page} of {} kept its text layer after OCR failed: {error:#}",
                    pdf_path.display()
                );
                warn!("{message}");
                warnings.push(message);
                pages.push(layer_text.clone());
            }
        }
    }

    Ok(SourceText {
        text: join_pages(&pages),
        origin: TextOrigin::Ocr,
        page_count: pages.len(),
        warnings,
    })
}

fn join_pages(pages: &[String]) -> String {
    pages.join(&format!("\n{PAGE_BREAK}\n"))
}

/// Rasterizes one page and returns tesseract's reading of it.
fn ocr_page(pdf_path: &Path, page: usize, ocr_lang: &str) -> Result<String> {
    let image = raster_path(pdf_path, page);
    let image_root = image.with_extension("");
    let page_arg = page.to_string();
    let page_arg = page_arg.as_str();

    let raster = Command::new("pdftoppm")
        .args(["-f", page_arg, "-l", page_arg, "-singlefile", "-r", RASTER_DPI, "-png"])
        .arg(pdf_path)
        .arg(&image_root)
        .output()
        .with_context(|| format!("failed to run pdftoppm on {}", pdf_path.display()))?;
    ensure_success("pdftoppm", &raster, pdf_path, page)?;
    if !image.exists() {
        bail!(
            "pdftoppm wrote no image for page {page} of {}",
            pdf_path.display()
        );
    }

    let reading = Command::new("tesseract")
        .arg(&image)
        .args(["stdout", "-l", ocr_lang])
        .output()
        .with_context(|| format!("failed to run tesseract on {}", image.display()));
    let _ = fs::remove_file(&image);
    let reading = reading?;
    ensure_success("tesseract", &reading, pdf_path, page)?;

    Ok(String::from_utf8_lossy(&reading.stdout)
        .replace('\u{0000}', "")
        .trim()
        .to_string())
}

fn raster_path(pdf_path: &Path, page: usize) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("report");
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    std::env::temp_dir().join(format!(
        "rmm_ocr_{}_{}_p{page}_{stamp}.png",
        sanitize_client_name(stem),
        std::process::id()
    ))
}

fn ensure_success(tool: &str, output: &Output, pdf_path: &Path, page: usize) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    bail!(
        "{tool} exited with {} on page {page} of {}: {}",
        output.status,
        pdf_path.display(),
        String::from_utf8_lossy(&output.stderr).trim()
    )
}

fn ocr_tools_present() -> bool {
    let spawns = |program: &str, flag: &str| Command::new(program).arg(flag).output().is_ok();
    spawns("pdftoppm", "-v") && spawns("tesseract", "--version")
}

/// One entry per page of the PDF's text layer, blank pages included, so
/// image-only reports still get every page rasterized.
fn text_layer_pages(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .args(["-enc", "UTF-8", "-layout"])
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to run pdftotext on {}", pdf_path.display()))?;
    if !output.status.success() {
        bail!(
            "pdftotext exited with {} on {}: {}",
            output.status,
            pdf_path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(split_text_layer(&String::from_utf8_lossy(&output.stdout)))
}

/// pdftotext ends every page with a form feed; only the remainder after the
/// last one is not a page.
fn split_text_layer(raw: &str) -> Vec<String> {
    let mut pages = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect::<Vec<String>>();
    if pages.last().is_some_and(|tail| tail.trim().is_empty()) {
        pages.pop();
    }
    pages
}
