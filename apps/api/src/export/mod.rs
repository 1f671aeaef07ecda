//! Report export: renders an entry's report text (plus recruiter notes) as a
//! downloadable PDF or DOCX.
//!
//! Both writers consume the same line-level `Block` parse of the markdown-like
//! report, so headings, bullets and spacing stay consistent across formats.

pub mod docx;
pub mod font_metrics;
pub mod pdf;

use thiserror::Error;

use crate::matching::report::with_recruiter_notes;
use crate::models::analysis::AnalysisEntry;

pub const REPORT_TITLE: &str = "Talent Match Assistant";
const BULLET_PREFIX: &str = "• ";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("DOCX rendering failed: {0}")]
    Docx(String),
}

/// Downloadable document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    fn render(self, title: &str, subtitle: &str, body: &str) -> Result<Vec<u8>, ExportError> {
        match self {
            ExportFormat::Pdf => pdf::render_pdf(title, subtitle, body),
            ExportFormat::Docx => docx::render_docx(title, subtitle, body),
        }
    }
}

/// A rendered document ready to be served as an attachment.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Renders the entry's report with its recruiter notes appended.
pub fn export_entry(
    entry: &AnalysisEntry,
    format: ExportFormat,
) -> Result<ExportedDocument, ExportError> {
    let body = with_recruiter_notes(&entry.report_text, &entry.recruiter_notes);
    let bytes = format.render(REPORT_TITLE, &export_subtitle(entry), &body)?;

    Ok(ExportedDocument {
        file_name: export_file_name(&entry.cv_source, format),
        mime_type: format.mime_type(),
        bytes,
    })
}

pub fn export_subtitle(entry: &AnalysisEntry) -> String {
    format!(
        "Score: {}/100 | Recommendation: {} | {}",
        entry.overall_score(),
        entry.recommendation(),
        entry.cv_source
    )
}

/// `talent_match_{source}.{ext}` with spaces in the source replaced by underscores.
pub fn export_file_name(cv_source: &str, format: ExportFormat) -> String {
    let source = if cv_source.trim().is_empty() {
        "candidate"
    } else {
        cv_source
    };
    format!("talent_match_{}.{}", source.replace(' ', "_"), format.extension())
}

// ────────────────────────────────────────────────────────────────────────────
// Line-level parse shared by both writers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `## Heading`
    Heading(String),
    /// `**Label**` on a line of its own.
    Label(String),
    /// `- item` or `* item`, carried with its "• " marker.
    Bullet(String),
    Paragraph(String),
    Blank,
}

pub fn parse_blocks(body: &str) -> Vec<Block> {
    body.replace("\r\n", "\n")
        .lines()
        .map(|raw| classify_line(raw.trim()))
        .collect()
}

fn classify_line(line: &str) -> Block {
    if line.is_empty() {
        return Block::Blank;
    }
    if let Some(heading) = line.strip_prefix("## ") {
        return Block::Heading(heading.trim().to_string());
    }
    if let Some(label) = line
        .strip_prefix("**")
        .and_then(|rest| rest.strip_suffix("**"))
        .filter(|label| !label.trim().is_empty())
    {
        return Block::Label(label.trim().to_string());
    }
    if let Some(item) = line.strip_prefix('-').or_else(|| line.strip_prefix('*')) {
        return Block::Bullet(format!("{BULLET_PREFIX}{}", item.trim()));
    }
    Block::Paragraph(line.to_string())
}
