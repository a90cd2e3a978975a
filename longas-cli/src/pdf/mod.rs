//! Occupancy report extraction from PDF documents
//!
//! This module handles:
//! - Interpreting page content into ruling edges and positioned text
//! - Detecting ruled tables and accepting those with the occupancy header
//! - Reading the report's reference date from the first page

pub mod content;
pub mod fonts;
pub mod geometry;
pub mod grid;
pub mod reference_date;
pub mod schema;

use std::path::Path;

use chrono::NaiveDate;
use lopdf::Document;

use crate::occupancy::{ReferenceDate, Snapshot};

pub use geometry::PageLayout;
pub use grid::TableSettings;

/// Error reading a report document
#[derive(Debug, Clone)]
pub enum ExtractError {
    /// The file is missing or not a PDF lopdf can parse
    Open { path: String, message: String },
    /// A page's content stream could not be read or decoded
    Page { page: u32, message: String },
}

impl ExtractError {
    pub(crate) fn page(page: u32, err: impl std::fmt::Display) -> Self {
        ExtractError::Page {
            page,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Open { path, message } => {
                write!(f, "Failed to open document '{}': {}", path, message)
            }
            ExtractError::Page { page, message } => {
                write!(f, "Failed to read page {}: {}", page, message)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Turns one report document into a snapshot
#[derive(Debug, Clone)]
pub struct DocumentTableExtractor {
    settings: TableSettings,
    /// Date used when the document carries none
    today: NaiveDate,
}

impl DocumentTableExtractor {
    pub fn new(settings: TableSettings, today: NaiveDate) -> Self {
        Self { settings, today }
    }

    /// Extract the snapshot of a PDF file.
    ///
    /// A document without any matching table yields an empty snapshot.
    pub fn extract(&self, path: &Path) -> Result<Snapshot, ExtractError> {
        let doc = Document::load(path).map_err(|err| ExtractError::Open {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        self.extract_document(&doc)
    }

    /// Reference date of a PDF file. Never fails: unreadable documents
    /// resolve to today's date flagged as a fallback.
    pub fn reference_date(&self, path: &Path) -> ReferenceDate {
        let first_page = Document::load(path)
            .map_err(|err| log::warn!("Could not open {} for its date: {}", path.display(), err))
            .ok()
            .and_then(|doc| {
                let (number, page_id) = doc.get_pages().into_iter().next()?;
                content::page_layout(&doc, number, page_id).ok()
            });

        reference_date::resolve(first_page.map(|p| p.text()).as_deref(), self.today)
    }

    fn extract_document(&self, doc: &Document) -> Result<Snapshot, ExtractError> {
        let mut pages = Vec::new();
        for (number, page_id) in doc.get_pages() {
            pages.push(content::page_layout(doc, number, page_id)?);
        }
        Ok(self.extract_layouts(&pages))
    }

    /// Build a snapshot from already interpreted pages
    pub fn extract_layouts(&self, pages: &[PageLayout]) -> Snapshot {
        let first_page_text = pages.first().map(PageLayout::text);
        let reference_date = reference_date::resolve(first_page_text.as_deref(), self.today);

        let mut records = Vec::new();
        let mut accepted = 0usize;
        let mut rejected = 0usize;

        for (index, page) in pages.iter().enumerate() {
            for table in grid::find_tables(page, &self.settings) {
                match schema::table_records(&table) {
                    Some(rows) => {
                        log::debug!("Page {}: accepted table with {} rows", index + 1, rows.len());
                        accepted += 1;
                        records.extend(rows);
                    }
                    None => rejected += 1,
                }
            }
        }

        log::info!(
            "Extraction complete: {} tables accepted, {} ignored, {} rows",
            accepted,
            rejected,
            records.len()
        );

        Snapshot::new(records, reference_date)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::occupancy::{DateSource, OccupancyRecord};
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    fn latin1(text: &str) -> Object {
        Object::string_literal(text.chars().map(|c| c as u32 as u8).collect::<Vec<u8>>())
    }

    pub(crate) fn text_ops(x: i64, y: i64, text: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(8)]),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
            Operation::new("Tj", vec![latin1(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    /// A stroked grid with one text run per cell; columns are 100 units wide
    pub(crate) fn table_ops(left: i64, top: i64, rows: &[&[&str]]) -> Vec<Operation> {
        let columns = rows.first().map(|r| r.len()).unwrap_or(0) as i64;
        let row_height = 20;
        let right = left + columns * 100;
        let bottom = top - rows.len() as i64 * row_height;

        let mut ops = Vec::new();
        for r in 0..=rows.len() as i64 {
            let y = top - r * row_height;
            ops.push(Operation::new("m", vec![Object::Integer(left), Object::Integer(y)]));
            ops.push(Operation::new("l", vec![Object::Integer(right), Object::Integer(y)]));
        }
        for c in 0..=columns {
            let x = left + c * 100;
            ops.push(Operation::new("m", vec![Object::Integer(x), Object::Integer(top)]));
            ops.push(Operation::new("l", vec![Object::Integer(x), Object::Integer(bottom)]));
        }
        ops.push(Operation::new("S", vec![]));

        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                let x = left + c as i64 * 100 + 3;
                let y = top - (r as i64 + 1) * row_height + 6;
                ops.extend(text_ops(x, y, text));
            }
        }
        ops
    }

    /// Serialize pages of operations into a PDF using a WinAnsi Helvetica font
    pub(crate) fn fixture_pdf(pages: Vec<Vec<Operation>>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::new();
        for operations in pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(842),
                    Object::Integer(595),
                ],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn extractor() -> DocumentTableExtractor {
        DocumentTableExtractor::new(
            TableSettings::default(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    fn extract_fixture(bytes: &[u8]) -> Result<Snapshot, ExtractError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, bytes).unwrap();
        extractor().extract(&path)
    }

    const HEADER: &[&str] = &["Leito", "Atendimento", "Paciente", "Dias de Ocupação", "Métrica"];

    #[test]
    fn test_extracts_records_across_pages() {
        let mut first = text_ops(40, 560, "Longa Permanência - 14/03/2025");
        first.extend(table_ops(40, 520, &[&["Indicador", "Valor"], &["Ocupação", "91%"]]));
        first.extend(table_ops(
            40,
            440,
            &[
                HEADER,
                &["BOX 1", "9001", "Ana Souza", "40", "x"],
                &["101A", "9002", "Carlos", "n/d", ""],
            ],
        ));

        let second = table_ops(
            40,
            520,
            &[
                &["Paciente", "Leito", "Dias de Ocupação", "Atendimento"],
                &["Duplicada", "101A", "99", "9999"],
                &["Rita", "202", "31", "9003"],
            ],
        );

        let snapshot = extract_fixture(&fixture_pdf(vec![first, second])).unwrap();

        assert_eq!(snapshot.reference_date.to_string(), "14/03/2025");
        assert_eq!(snapshot.reference_date.source, DateSource::Document);
        assert_eq!(
            snapshot.records,
            vec![
                OccupancyRecord::new("BOX 1", "9001", "Ana Souza", 40),
                OccupancyRecord::new("101A", "9002", "Carlos", 0),
                OccupancyRecord::new("202", "9003", "Rita", 31),
            ]
        );
    }

    #[test]
    fn test_document_without_matching_table_is_empty_not_error() {
        let mut page = text_ops(40, 560, "Relatório sem data");
        page.extend(table_ops(40, 520, &[&["Leito", "Paciente"], &["101", "Ana"]]));

        let snapshot = extract_fixture(&fixture_pdf(vec![page])).unwrap();

        assert!(snapshot.is_empty());
        assert!(snapshot.reference_date.used_fallback());
        assert_eq!(snapshot.reference_date.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_garbage_input_is_an_open_error() {
        let err = extract_fixture(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Open { .. }));
    }

    #[test]
    fn test_reference_date_of_missing_file_falls_back() {
        let date = extractor().reference_date(Path::new("/nonexistent/report.pdf"));
        assert!(date.used_fallback());
        assert_eq!(date.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_reference_date_read_from_first_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let first = text_ops(40, 560, "Emitido em 02/05/2025");
        let second = text_ops(40, 560, "Página 2 - 09/09/2099");
        std::fs::write(&path, fixture_pdf(vec![first, second])).unwrap();

        let date = extractor().reference_date(&path);
        assert_eq!(date.to_string(), "02/05/2025");
        assert_eq!(date.source, DateSource::Document);
    }
}
