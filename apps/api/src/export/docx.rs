//! DOCX writer: title and section headings use paragraph heading styles,
//! bullets keep their "• " marker, blank lines are dropped.

use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run, Style, StyleType};

use crate::export::{parse_blocks, Block, ExportError};

const TITLE_STYLE: &str = "Heading1";
const SECTION_STYLE: &str = "Heading2";

pub fn render_docx(title: &str, subtitle: &str, body: &str) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new()
        .add_style(
            Style::new(TITLE_STYLE, StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new(SECTION_STYLE, StyleType::Paragraph)
                .name("Heading 2")
                .size(26)
                .bold(),
        )
        .add_paragraph(styled(TITLE_STYLE, title));

    if !subtitle.is_empty() {
        docx = docx.add_paragraph(plain(subtitle));
    }

    for block in parse_blocks(body) {
        docx = match block {
            Block::Blank => docx,
            Block::Heading(text) => docx.add_paragraph(styled(SECTION_STYLE, &text)),
            Block::Label(text) => {
                docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(text).bold()))
            }
            Block::Bullet(text) | Block::Paragraph(text) => docx.add_paragraph(plain(&text)),
        };
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ExportError::Docx(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn styled(style: &str, text: &str) -> Paragraph {
    Paragraph::new()
        .style(style)
        .add_run(Run::new().add_text(text))
}

fn plain(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::docx::extract_docx_text;

    #[test]
    fn test_docx_round_trips_through_the_extractor() {
        let body = "## Candidate\n- Source: cv.pdf (PDF)\n\n**Subscores**\n- Skills: 80\n\nPlain line";
        let bytes = render_docx("Talent Match Assistant", "Score: 80/100", body).unwrap();

        let text = extract_docx_text(&bytes).unwrap();
        assert_eq!(
            text,
            "Talent Match Assistant\nScore: 80/100\nCandidate\n• Source: cv.pdf (PDF)\nSubscores\n• Skills: 80\nPlain line"
        );
    }

    #[test]
    fn test_subtitle_is_optional() {
        let bytes = render_docx("Title", "", "").unwrap();
        assert_eq!(extract_docx_text(&bytes).unwrap(), "Title");
    }
}
