//! Printable report writer.
//!
//! One A4 page per process, starting with a centred-ish title and followed
//! by `column: value` lines. Long values are wrapped; a record that does not
//! fit continues on a new page.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use super::{ExportRow, COLUMNS};
use crate::error::ExportError;

/// Heading printed at the top of each record page.
pub const PAGE_TITLE: &str = "Relatório de Processo";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 15.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 15.0;
const LINE_HEIGHT: f32 = 5.0;
const WRAP_WIDTH: usize = 95;

fn pdf_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// Tracks the write position and opens new pages as needed.
struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl Cursor<'_> {
    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < BOTTOM {
            self.new_page();
        }
        self.layer
            .use_text(text, size, Mm(MARGIN_LEFT), Mm(self.y), font);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}

/// Write one page per row.
pub fn write_pdf(rows: &[ExportRow], path: &Path) -> Result<(), ExportError> {
    let (doc, page1, layer1) =
        PdfDocument::new("Processos", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let mut cursor = Cursor {
        doc: &doc,
        layer: doc.get_page(page1).get_layer(layer1),
        y: TOP,
    };

    if rows.is_empty() {
        cursor.line("Nenhum processo encontrado.", 10.0, &font);
    }

    for (idx, row) in rows.iter().enumerate() {
        if idx > 0 {
            cursor.new_page();
        }
        cursor.line(PAGE_TITLE, 12.0, &bold);
        cursor.gap(4.0);

        for (name, value) in COLUMNS.iter().zip(row.cells()) {
            let value = if value.is_empty() { "-".to_string() } else { value };
            let text = format!("{name}: {value}");
            for paragraph in text.lines() {
                for wrapped in textwrap::wrap(paragraph, WRAP_WIDTH) {
                    cursor.line(&wrapped, 10.0, &font);
                }
            }
        }
    }

    drop(cursor);
    let mut writer = BufWriter::new(File::create(path)?);
    doc.save(&mut writer).map_err(pdf_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::rows;
    use tempfile::tempdir;

    #[test]
    fn test_write_pdf_has_pdf_structure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processos.pdf");
        write_pdf(&rows(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_write_pdf_overflows_to_new_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.pdf");
        let mut data = rows();
        data[0].deadline_mentions = vec!["Intimação para manifestação no prazo legal"; 120].join("\n");
        write_pdf(&data, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
