//! One reconciliation cycle, from report documents to a dated workbook
//!
//! The cycle extracts the current (and optionally previous) report, reads the
//! annotations of the base workbook, builds a [`ReconcilePlan`] and applies it
//! through a [`WorkbookTransaction`]. The base workbook is only read; the
//! result is written as a new file in a single save.

pub mod error;
pub mod plan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::config::SheetLayout;
use crate::occupancy::ReferenceDate;
use crate::pdf::DocumentTableExtractor;
use crate::workbook::{WorkbookTransaction, read_annotations, read_workbook};

pub use error::UpdateError;
pub use plan::{CurrentRow, HistoryRow, HistoryUpdate, ReconcilePlan, build_plan};

/// Stages a cycle passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Start,
    ExtractedCurrent,
    ExtractedPrevious,
    SkippedPrevious,
    AnnotationsRead,
    RewrittenCurrent,
    HistoryAppended,
    HistorySkipped,
    Persisted,
}

/// Stages reached so far
#[derive(Debug, Clone, Default)]
struct CycleTrace {
    stages: Vec<CycleStage>,
}

impl CycleTrace {
    fn start() -> Self {
        let mut trace = Self::default();
        trace.advance(CycleStage::Start);
        trace
    }

    fn advance(&mut self, stage: CycleStage) {
        log::debug!("Cycle stage: {:?}", stage);
        self.stages.push(stage);
    }
}

/// Inputs of one cycle
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub current: Option<PathBuf>,
    pub previous: Option<PathBuf>,
    pub template: PathBuf,
    pub output_dir: PathBuf,
    /// Date stamped as the generation date
    pub generated_on: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ReconcileSummary {
    pub output_path: PathBuf,
    pub reference_date: ReferenceDate,
    pub current_beds: usize,
    pub discharges: usize,
    pub arrivals: usize,
    /// No previous report: history was left untouched
    pub baseline: bool,
    pub stages: Vec<CycleStage>,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed(ReconcileSummary),
    /// The current report has no occupancy table; nothing was written
    NoValidTable { reference_date: ReferenceDate },
}

/// Runs reconciliation cycles against one workbook layout
pub struct SpreadsheetReconciler<'a> {
    extractor: &'a DocumentTableExtractor,
    layout: &'a SheetLayout,
}

impl<'a> SpreadsheetReconciler<'a> {
    pub fn new(extractor: &'a DocumentTableExtractor, layout: &'a SheetLayout) -> Self {
        Self { extractor, layout }
    }

    /// Run a full cycle.
    ///
    /// Missing inputs fail with an [`UpdateError`] before anything is read.
    pub fn run(&self, request: &UpdateRequest) -> Result<CycleOutcome> {
        let current_path = match &request.current {
            None => return Err(UpdateError::MissingCurrentDocument { path: None }.into()),
            Some(path) if !path.is_file() => {
                return Err(UpdateError::MissingCurrentDocument {
                    path: Some(path.clone()),
                }
                .into());
            }
            Some(path) => path,
        };

        if !request.template.is_file() {
            return Err(UpdateError::MissingTemplate {
                path: request.template.clone(),
            }
            .into());
        }

        let mut trace = CycleTrace::start();

        let current = self
            .extractor
            .extract(current_path)
            .with_context(|| format!("Failed to extract {}", current_path.display()))?;
        trace.advance(CycleStage::ExtractedCurrent);
        log::info!(
            "Current report: {} beds, reference date {} ({})",
            current.len(),
            current.reference_date,
            current.reference_date.source
        );

        if current.is_empty() {
            log::warn!("No occupancy table found in {}", current_path.display());
            return Ok(CycleOutcome::NoValidTable {
                reference_date: current.reference_date,
            });
        }

        let previous = match &request.previous {
            Some(path) => {
                let snapshot = self
                    .extractor
                    .extract(path)
                    .with_context(|| format!("Failed to extract {}", path.display()))?;
                if snapshot.is_empty() {
                    log::warn!("Previous report {} has no occupancy table", path.display());
                }
                trace.advance(CycleStage::ExtractedPrevious);
                Some(snapshot)
            }
            None => {
                trace.advance(CycleStage::SkippedPrevious);
                None
            }
        };

        let contents = read_workbook(&request.template)?;
        let transaction = WorkbookTransaction::begin(contents, self.layout)?;
        let annotations = transaction
            .contents()
            .sheet(&self.layout.current_sheet)
            .map(|sheet| read_annotations(sheet, self.layout))
            .unwrap_or_default();
        trace.advance(CycleStage::AnnotationsRead);

        let plan = build_plan(&current, previous.as_ref(), &annotations, request.generated_on);

        let staged = transaction.apply(&plan)?;
        trace.advance(CycleStage::RewrittenCurrent);
        trace.advance(if plan.is_baseline() {
            CycleStage::HistorySkipped
        } else {
            CycleStage::HistoryAppended
        });

        std::fs::create_dir_all(&request.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                request.output_dir.display()
            )
        })?;
        let output_path = request
            .output_dir
            .join(format!("Longas_{}.xlsx", plan.reference_date.file_stamp()));
        staged.commit(&output_path)?;
        trace.advance(CycleStage::Persisted);

        log::info!(
            "Cycle complete: {} beds, {} discharges, {} arrivals",
            plan.current_rows.len(),
            plan.discharge_count(),
            plan.arrivals
        );

        Ok(CycleOutcome::Completed(ReconcileSummary {
            output_path,
            reference_date: plan.reference_date,
            current_beds: plan.current_rows.len(),
            discharges: plan.discharge_count(),
            arrivals: plan.arrivals,
            baseline: plan.is_baseline(),
            stages: trace.stages,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::TableSettings;
    use crate::pdf::tests::{fixture_pdf, table_ops, text_ops};
    use crate::workbook::{CellValue, WorkbookContents};
    use crate::workbook::reader::MergedRange;
    use rust_xlsxwriter::{Format, Formula, Workbook};
    use std::path::Path;

    const HEADER: &[&str] = &["Leito", "Atendimento", "Paciente", "Dias de Ocupação"];

    fn write_report(path: &Path, date: &str, rows: &[&[&str]]) {
        let mut table: Vec<&[&str]> = vec![HEADER];
        table.extend_from_slice(rows);

        let mut page = text_ops(40, 560, &format!("Longa Permanência {}", date));
        page.extend(table_ops(40, 520, &table));
        std::fs::write(path, fixture_pdf(vec![page])).unwrap();
    }

    fn write_template(path: &Path) {
        let mut workbook = Workbook::new();

        let dados = workbook.add_worksheet();
        dados.set_name("Dados").unwrap();
        dados
            .merge_range(0, 0, 0, 5, "Longas Permanências", &Format::new())
            .unwrap();
        dados
            .write_formula(0, 7, Formula::new("=1+1").set_result("2"))
            .unwrap();
        let titles = ["Leito", "Atendimento", "Paciente", "Dias", "Situação", "OBS"];
        for (c, title) in titles.iter().enumerate() {
            dados.write_string(4, c as u16, *title).unwrap();
        }
        dados.write_string(5, 0, "A").unwrap();
        dados.write_number(5, 3, 40.0).unwrap();
        dados.write_string(5, 4, "Alta prevista").unwrap();
        dados.write_string(5, 5, "ligar família").unwrap();
        dados.write_string(6, 0, "B").unwrap();
        dados.write_string(6, 4, "Aguardando exame").unwrap();
        dados.write_boolean(6, 5, true).unwrap();
        let date = Format::new().set_num_format("dd/mm/yyyy");
        dados.write_string(7, 0, "C").unwrap();
        dados.write_number_with_format(7, 4, 45731.0, &date).unwrap();
        dados.write_number(7, 5, 3.0).unwrap();

        let historico = workbook.add_worksheet();
        historico.set_name("Historico").unwrap();
        historico.write_string(0, 0, "Leito").unwrap();
        historico.write_string(1, 0, "Z").unwrap();

        workbook.save(path).unwrap();
    }

    struct Fixture {
        dir: tempfile::TempDir,
        extractor: DocumentTableExtractor,
        layout: SheetLayout,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            write_template(&dir.path().join("Longas.xlsx"));
            Self {
                dir,
                extractor: DocumentTableExtractor::new(
                    TableSettings::default(),
                    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                ),
                layout: SheetLayout::default(),
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn request(&self, current: Option<&str>, previous: Option<&str>) -> UpdateRequest {
            UpdateRequest {
                current: current.map(|n| self.path(n)),
                previous: previous.map(|n| self.path(n)),
                template: self.path("Longas.xlsx"),
                output_dir: self.path("out"),
                generated_on: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            }
        }

        fn run(&self, request: &UpdateRequest) -> Result<CycleOutcome> {
            SpreadsheetReconciler::new(&self.extractor, &self.layout).run(request)
        }
    }

    fn completed(outcome: CycleOutcome) -> ReconcileSummary {
        match outcome {
            CycleOutcome::Completed(summary) => summary,
            other => panic!("expected a completed cycle, got {:?}", other),
        }
    }

    fn read(path: &Path) -> WorkbookContents {
        read_workbook(path).unwrap()
    }

    #[test]
    fn test_discharge_moves_bed_to_history_with_annotation() {
        let fx = Fixture::new();
        write_report(
            &fx.path("prev.pdf"),
            "07/03/2025",
            &[
                &["A", "11", "Ana", "40"],
                &["B", "12", "Bia", "31"],
                &["C", "13", "Caio", "30"],
            ],
        );
        write_report(
            &fx.path("cur.pdf"),
            "14/03/2025",
            &[
                &["B", "12", "Bia", "38"],
                &["C", "13", "Caio", "37"],
                &["D", "14", "Davi", "1"],
            ],
        );

        let request = fx.request(Some("cur.pdf"), Some("prev.pdf"));
        let summary = completed(fx.run(&request).unwrap());

        assert_eq!(summary.output_path, fx.path("out").join("Longas_14-03-2025.xlsx"));
        assert_eq!(summary.current_beds, 3);
        assert_eq!(summary.discharges, 1);
        assert_eq!(summary.arrivals, 1);
        assert!(!summary.baseline);

        let output = read(&summary.output_path);
        let historico = output.sheet("Historico").unwrap();
        assert_eq!(historico.used_rows(), 3);
        assert_eq!(historico.cell(1, 0), &CellValue::text("Z"));
        assert_eq!(historico.cell(2, 0), &CellValue::text("A"));
        assert_eq!(historico.cell(2, 3), &CellValue::Number(40.0));
        assert_eq!(historico.cell(2, 4), &CellValue::text("Alta prevista"));
        assert_eq!(historico.cell(2, 5), &CellValue::text("ligar família"));
        assert_eq!(historico.cell(2, 6), &CellValue::text("14/03/2025"));

        let dados = output.sheet("Dados").unwrap();
        assert_eq!(dados.cell(0, 0), &CellValue::text("Longas Permanências"));
        assert_eq!(dados.cell(1, 5), &CellValue::text("15/03/2025"));
        assert_eq!(dados.cell(2, 5), &CellValue::text("14/03/2025"));
        assert_eq!(dados.cell(5, 0), &CellValue::text("B"));
        assert_eq!(dados.cell(5, 3), &CellValue::Number(38.0));
        assert_eq!(dados.cell(5, 4), &CellValue::text("Aguardando exame"));
        assert_eq!(dados.cell(6, 0), &CellValue::text("C"));
        assert_eq!(dados.cell(6, 4), &CellValue::Date(45731.0));
        assert_eq!(dados.cell(7, 0), &CellValue::text("D"));
        assert_eq!(dados.cell(7, 4), &CellValue::Empty);
        assert_eq!(dados.used_rows(), 8);
    }

    #[test]
    fn test_baseline_leaves_history_untouched() {
        let fx = Fixture::new();
        write_report(&fx.path("cur.pdf"), "14/03/2025", &[&["A", "11", "Ana", "41"]]);

        let summary = completed(fx.run(&fx.request(Some("cur.pdf"), None)).unwrap());

        assert!(summary.baseline);
        assert_eq!(summary.discharges, 0);
        assert_eq!(
            summary.stages,
            vec![
                CycleStage::Start,
                CycleStage::ExtractedCurrent,
                CycleStage::SkippedPrevious,
                CycleStage::AnnotationsRead,
                CycleStage::RewrittenCurrent,
                CycleStage::HistorySkipped,
                CycleStage::Persisted,
            ]
        );

        let template = read(&fx.path("Longas.xlsx"));
        let output = read(&summary.output_path);
        assert_eq!(output.sheet("Historico"), template.sheet("Historico"));
    }

    #[test]
    fn test_template_is_never_modified() {
        let fx = Fixture::new();
        let before = std::fs::read(fx.path("Longas.xlsx")).unwrap();
        write_report(&fx.path("cur.pdf"), "14/03/2025", &[&["A", "11", "Ana", "41"]]);

        completed(fx.run(&fx.request(Some("cur.pdf"), None)).unwrap());

        assert_eq!(std::fs::read(fx.path("Longas.xlsx")).unwrap(), before);
    }

    #[test]
    fn test_rerun_keeps_annotations() {
        let fx = Fixture::new();
        write_report(
            &fx.path("cur.pdf"),
            "14/03/2025",
            &[&["A", "11", "Ana", "41"], &["B", "12", "Bia", "32"]],
        );

        let first = completed(fx.run(&fx.request(Some("cur.pdf"), None)).unwrap());
        let mut again = fx.request(Some("cur.pdf"), None);
        again.template = first.output_path.clone();
        again.output_dir = fx.path("again");
        let second = completed(fx.run(&again).unwrap());

        let first_dados = read(&first.output_path).sheet("Dados").cloned().unwrap();
        let second_dados = read(&second.output_path).sheet("Dados").cloned().unwrap();
        assert_eq!(first_dados, second_dados);
        assert_eq!(second_dados.cell(5, 5), &CellValue::text("ligar família"));
    }

    #[test]
    fn test_typed_annotations_and_formulas_survive_a_cycle() {
        let fx = Fixture::new();
        write_report(
            &fx.path("prev.pdf"),
            "07/03/2025",
            &[
                &["A", "11", "Ana", "40"],
                &["B", "12", "Bia", "31"],
                &["C", "13", "Caio", "30"],
            ],
        );
        write_report(
            &fx.path("cur.pdf"),
            "14/03/2025",
            &[&["A", "11", "Ana", "47"], &["B", "12", "Bia", "38"]],
        );

        let request = fx.request(Some("cur.pdf"), Some("prev.pdf"));
        let summary = completed(fx.run(&request).unwrap());
        let output = read(&summary.output_path);

        let dados = output.sheet("Dados").unwrap();
        assert_eq!(dados.cell(6, 0), &CellValue::text("B"));
        assert_eq!(dados.cell(6, 5), &CellValue::Bool(true));
        assert_eq!(
            dados.cell(0, 7),
            &CellValue::Formula {
                formula: "1+1".to_string(),
                result: "2".to_string()
            }
        );
        assert_eq!(
            dados.merged,
            vec![MergedRange {
                first_row: 0,
                first_col: 0,
                last_row: 0,
                last_col: 5
            }]
        );

        let historico = output.sheet("Historico").unwrap();
        assert_eq!(historico.cell(2, 0), &CellValue::text("C"));
        assert_eq!(historico.cell(2, 4), &CellValue::Date(45731.0));
        assert_eq!(historico.cell(2, 5), &CellValue::Number(3.0));
    }

    #[test]
    fn test_no_valid_table_writes_nothing() {
        let fx = Fixture::new();
        let page = table_ops(40, 520, &[&["Leito", "Paciente"], &["A", "Ana"]]);
        std::fs::write(fx.path("cur.pdf"), fixture_pdf(vec![page])).unwrap();

        let outcome = fx.run(&fx.request(Some("cur.pdf"), None)).unwrap();

        assert!(matches!(outcome, CycleOutcome::NoValidTable { .. }));
        assert!(!fx.path("out").exists());
    }

    #[test]
    fn test_missing_current_document_is_rejected() {
        let fx = Fixture::new();

        let err = fx.run(&fx.request(None, None)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<UpdateError>(),
            Some(&UpdateError::MissingCurrentDocument { path: None })
        );

        let err = fx.run(&fx.request(Some("absent.pdf"), None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UpdateError>(),
            Some(UpdateError::MissingCurrentDocument { path: Some(_) })
        ));
    }

    #[test]
    fn test_missing_template_is_a_hard_failure() {
        let fx = Fixture::new();
        write_report(&fx.path("cur.pdf"), "14/03/2025", &[&["A", "11", "Ana", "41"]]);
        let mut request = fx.request(Some("cur.pdf"), None);
        request.template = fx.path("missing.xlsx");

        let err = fx.run(&request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UpdateError>(),
            Some(UpdateError::MissingTemplate { .. })
        ));
        assert!(!fx.path("out").exists());
    }
}
