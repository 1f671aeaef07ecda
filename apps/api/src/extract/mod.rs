//! CV text extraction: turns an uploaded PDF or DOCX into plain text.
//!
//! `AppState` holds an `Arc<dyn CvExtractor>`; `DocumentExtractor` is the default.
//! Extraction is CPU-bound and is run on the blocking pool by the batch runner.

pub mod docx;

use std::fmt;

use thiserror::Error;

/// Document formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvFormat {
    Pdf,
    Docx,
}

impl CvFormat {
    /// Lowercase tag, e.g. `pdf`.
    pub fn tag(self) -> &'static str {
        match self {
            CvFormat::Pdf => "pdf",
            CvFormat::Docx => "docx",
        }
    }

    /// Extension first, then magic bytes.
    pub fn detect(file_name: &str, bytes: &[u8]) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Some(CvFormat::Pdf)
        } else if lower.ends_with(".docx") {
            Some(CvFormat::Docx)
        } else if bytes.starts_with(b"%PDF-") {
            Some(CvFormat::Pdf)
        } else if bytes.len() > 4 && bytes.starts_with(b"PK") {
            Some(CvFormat::Docx)
        } else {
            None
        }
    }
}

impl fmt::Display for CvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag().to_uppercase())
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file format for '{0}' (expected PDF or DOCX)")]
    UnsupportedFormat(String),

    #[error("unable to read the PDF document: {0}")]
    Pdf(String),

    #[error("unable to read the DOCX document: {0}")]
    Docx(String),

    #[error("no text could be extracted from '{0}'")]
    NoText(String),
}

/// Plain text pulled out of an uploaded CV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCv {
    pub text: String,
    pub format: CvFormat,
}

impl ExtractedCv {
    /// Display name used as the entry's `cv_source`, e.g. `jane.pdf (PDF)`.
    pub fn source_label(&self, file_name: &str) -> String {
        format!("{file_name} ({})", self.format)
    }
}

pub trait CvExtractor: Send + Sync {
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractedCv, ExtractionError>;
}

/// Default extractor: `pdf-extract` for PDF, `docx-rs` for DOCX.
pub struct DocumentExtractor;

impl CvExtractor for DocumentExtractor {
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractedCv, ExtractionError> {
        let format = CvFormat::detect(file_name, bytes)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(file_name.to_string()))?;

        let raw = match format {
            CvFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ExtractionError::Pdf(e.to_string()))?,
            CvFormat::Docx => docx::extract_docx_text(bytes)?,
        };

        let text = normalize_text(&raw);
        if text.is_empty() {
            return Err(ExtractionError::NoText(file_name.to_string()));
        }

        Ok(ExtractedCv { text, format })
    }
}

/// Removes NULs and a leading BOM, unifies line endings, trims trailing
/// whitespace per line and surrounding blank lines.
pub fn normalize_text(text: &str) -> String {
    let normalized = text
        .replace('\u{0000}', "")
        .trim_start_matches('\u{FEFF}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let lines: Vec<&str> = normalized.lines().map(|line| line.trim_end()).collect();
    lines.join("\n").trim().to_string()
}
