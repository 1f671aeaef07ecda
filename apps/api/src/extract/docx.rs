//! DOCX text extraction: walks paragraphs, tables and hyperlinks in document order.

use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use crate::extract::ExtractionError;

pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let package = read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut segments = Vec::new();

    for child in &package.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => push_paragraph(paragraph, &mut segments),
            DocumentChild::Table(table) => collect_table_text(table, &mut segments),
            _ => {}
        }
    }

    Ok(segments.join("\n"))
}

fn push_paragraph(paragraph: &Paragraph, segments: &mut Vec<String>) {
    let mut buffer = String::new();
    for child in &paragraph.children {
        append_paragraph_child(child, &mut buffer);
    }
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}

fn append_paragraph_child(child: &ParagraphChild, buffer: &mut String) {
    match child {
        ParagraphChild::Run(run) => append_run_text(run, buffer),
        ParagraphChild::Hyperlink(hyperlink) => {
            for inner in &hyperlink.children {
                append_paragraph_child(inner, buffer);
            }
        }
        _ => {}
    }
}

fn append_run_text(run: &Run, buffer: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(text) => buffer.push_str(&text.text),
            RunChild::Break(_) => buffer.push('\n'),
            RunChild::Tab(_) => buffer.push('\t'),
            _ => {}
        }
    }
}

fn collect_table_text(table: &Table, segments: &mut Vec<String>) {
    for row in &table.rows {
        let row = match row {
            TableChild::TableRow(row) => row,
        };
        for cell in &row.cells {
            let cell = match cell {
                TableRowChild::TableCell(cell) => cell,
            };
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => push_paragraph(paragraph, segments),
                    TableCellContent::Table(inner) => collect_table_text(inner, segments),
                    _ => {}
                }
            }
        }
    }
}
