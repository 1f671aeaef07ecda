//! A4 PDF writer built directly on `lopdf` objects and content streams.
//!
//! Layout (points): 2 cm margins, 12 pt line advance, 16 pt bold title,
//! 10 pt subtitle, a rule under the header, 12 pt bold headings, 10 pt body.
//! The cursor starts at the top margin and a new page begins whenever it
//! falls below the bottom margin.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::export::font_metrics::{get_metrics, FontStyle};
use crate::export::{parse_blocks, Block, ExportError};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 56.69;
const LINE_ADVANCE: f32 = 12.0;
const HEADER_ADVANCE: f32 = 18.0;
const BLANK_ADVANCE: f32 = 8.0;
const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;
const SUBTITLE_MAX_CHARS: usize = 120;

pub fn render_pdf(title: &str, subtitle: &str, body: &str) -> Result<Vec<u8>, ExportError> {
    let mut canvas = Canvas::new();

    canvas.draw_string(FontStyle::Bold, TITLE_SIZE, title);
    canvas.y -= HEADER_ADVANCE;

    if !subtitle.is_empty() {
        let subtitle: String = subtitle.chars().take(SUBTITLE_MAX_CHARS).collect();
        canvas.draw_string(FontStyle::Regular, BODY_SIZE, &subtitle);
        canvas.y -= HEADER_ADVANCE;
    }

    canvas.y -= 6.0;
    canvas.rule();
    canvas.y -= HEADER_ADVANCE;

    for block in parse_blocks(body) {
        match block {
            Block::Blank => {
                canvas.y -= BLANK_ADVANCE;
                canvas.break_page_if_needed();
            }
            Block::Heading(text) => {
                canvas.y -= 6.0;
                canvas.draw_wrapped(FontStyle::Bold, HEADING_SIZE, &text);
                canvas.y -= 2.0;
            }
            Block::Label(text) => canvas.draw_wrapped(FontStyle::Bold, BODY_SIZE, &text),
            Block::Bullet(text) | Block::Paragraph(text) => {
                canvas.draw_wrapped(FontStyle::Regular, BODY_SIZE, &text)
            }
        }
    }

    canvas.finish()
}

/// Accumulates content-stream operations page by page.
struct Canvas {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl Canvas {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn top() -> f32 {
        PAGE_HEIGHT - MARGIN
    }

    fn max_text_width() -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    fn draw_string(&mut self, style: FontStyle, size: f32, text: &str) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(style.resource_name().as_bytes().to_vec()), Object::Real(size)],
            ),
            Operation::new("Td", vec![Object::Real(MARGIN), Object::Real(self.y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn draw_wrapped(&mut self, style: FontStyle, size: f32, text: &str) {
        for line in get_metrics(style).wrap(text, size, Self::max_text_width()) {
            self.draw_string(style, size, &line);
            self.y -= LINE_ADVANCE;
            self.break_page_if_needed();
        }
    }

    fn rule(&mut self) {
        self.current.extend([
            Operation::new("w", vec![Object::Real(0.5)]),
            Operation::new("m", vec![Object::Real(MARGIN), Object::Real(self.y)]),
            Operation::new(
                "l",
                vec![Object::Real(PAGE_WIDTH - MARGIN), Object::Real(self.y)],
            ),
            Operation::new("S", vec![]),
        ]);
    }

    fn break_page_if_needed(&mut self) {
        if self.y < MARGIN {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = Self::top();
        }
    }

    fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular_id = add_font(&mut doc, FontStyle::Regular);
        let bold_id = add_font(&mut doc, FontStyle::Bold);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                FontStyle::Regular.resource_name() => regular_id,
                FontStyle::Bold.resource_name() => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations };
            let encoded = content
                .encode()
                .map_err(|e| ExportError::Pdf(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        Ok(bytes)
    }
}

fn add_font(doc: &mut Document, style: FontStyle) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => style.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Maps text onto WinAnsiEncoding bytes. Latin-1 passes through, the few
/// typographic characters with a WinAnsi slot are remapped, the rest become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_renders_single_page_pdf() {
        let bytes = render_pdf("Title", "Score: 80/100", "## Candidate\n- Source: x").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_empty_body_still_produces_a_page() {
        let bytes = render_pdf("Title", "", "").unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_long_report_paginates() {
        let body: String = (0..200).map(|i| format!("- bullet number {i}\n")).collect();
        let bytes = render_pdf("Title", "sub", &body).unwrap();
        // ~60 lines fit on an A4 page at 12 pt
        assert!(page_count(&bytes) >= 3);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("A•B"), vec![b'A', 0x95, b'B']);
        assert_eq!(encode_win_ansi("é—"), vec![0xE9, 0x97]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
        assert_eq!(encode_win_ansi("a\tb"), b"a b".to_vec());
    }
}
