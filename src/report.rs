use crate::config::{PipelineConfig, ReportLabels};
use crate::error::{KeyMismatch, SchemaIssue, SourceKind, TractomeError};
use crate::merge::{fields, MergeOutcome};
use crate::sources::SourceAvailability;
use crate::table::{Cell, ColumnCollision, GeneTable};
use indexmap::IndexMap;
use log::debug;
use polars::prelude::{Column, DataFrame};
use serde_derive::Serialize;

/// Columns of the final report, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ReportColumn {
    GeneIdentifier,
    Gene,
    FoldChange,
    Tractability,
    Biotype,
    Drugs,
    InteractionTypes,
    Citations,
    MeanInteractionScore,
    Pathways,
}

impl ReportColumn {
    pub const ALL: [ReportColumn; 10] = [
        ReportColumn::GeneIdentifier,
        ReportColumn::Gene,
        ReportColumn::FoldChange,
        ReportColumn::Tractability,
        ReportColumn::Biotype,
        ReportColumn::Drugs,
        ReportColumn::InteractionTypes,
        ReportColumn::Citations,
        ReportColumn::MeanInteractionScore,
        ReportColumn::Pathways,
    ];

    /// The input a column depends on; it is omitted when that input is unavailable.
    pub fn source(&self) -> SourceKind {
        match self {
            ReportColumn::GeneIdentifier | ReportColumn::Gene | ReportColumn::FoldChange => SourceKind::Expression,
            ReportColumn::Tractability | ReportColumn::Biotype => SourceKind::Tractability,
            ReportColumn::Drugs | ReportColumn::InteractionTypes | ReportColumn::Citations | ReportColumn::MeanInteractionScore => SourceKind::DrugInteractions,
            ReportColumn::Pathways => SourceKind::Pathways,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ReportColumn::FoldChange | ReportColumn::MeanInteractionScore)
    }

    pub fn label<'a>(&self, labels: &'a ReportLabels) -> &'a str {
        match self {
            ReportColumn::GeneIdentifier => &labels.gene_identifier,
            ReportColumn::Gene => &labels.gene,
            ReportColumn::FoldChange => &labels.fold_change,
            ReportColumn::Tractability => &labels.tractability,
            ReportColumn::Biotype => &labels.biotype,
            ReportColumn::Drugs => &labels.drugs,
            ReportColumn::InteractionTypes => &labels.interaction_types,
            ReportColumn::Citations => &labels.citations,
            ReportColumn::MeanInteractionScore => &labels.mean_interaction_score,
            ReportColumn::Pathways => &labels.pathways,
        }
    }
}

/// One gene of the final report. `None` means the source had no row for the
/// gene (or was never merged); an empty string means it had one with no values.
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
pub struct MergedReportRow {
    pub gene_identifier: Option<String>,
    pub gene: String,
    pub fold_change: Option<f64>,
    pub tractability: Option<String>,
    pub biotype: Option<String>,
    pub drugs: Option<String>,
    pub interaction_types: Option<String>,
    pub citations: Option<String>,
    pub mean_interaction_score: Option<f64>,
    pub pathways: Option<String>,
}

impl MergedReportRow {
    pub fn text(&self, column: ReportColumn) -> Option<&str> {
        match column {
            ReportColumn::GeneIdentifier => self.gene_identifier.as_deref(),
            ReportColumn::Gene => Some(&self.gene),
            ReportColumn::Tractability => self.tractability.as_deref(),
            ReportColumn::Biotype => self.biotype.as_deref(),
            ReportColumn::Drugs => self.drugs.as_deref(),
            ReportColumn::InteractionTypes => self.interaction_types.as_deref(),
            ReportColumn::Citations => self.citations.as_deref(),
            ReportColumn::Pathways => self.pathways.as_deref(),
            ReportColumn::FoldChange | ReportColumn::MeanInteractionScore => None,
        }
    }

    pub fn number(&self, column: ReportColumn) -> Option<f64> {
        match column {
            ReportColumn::FoldChange => self.fold_change,
            ReportColumn::MeanInteractionScore => self.mean_interaction_score,
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<MergedReportRow>,
    pub labels: ReportLabels,
    pub availability: SourceAvailability,
    pub mismatches: Vec<KeyMismatch>,
    pub collisions: Vec<ColumnCollision>,
    pub duplicates_dropped: IndexMap<SourceKind, usize>,
    pub issues: Vec<SchemaIssue>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label(&self.labels)).collect()
    }

    /// The report as a frame with labelled columns. Fails if two labels coincide.
    pub fn to_data_frame(&self) -> Result<DataFrame, TractomeError> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|column| {
                let name = column.label(&self.labels).into();
                if column.is_numeric() {
                    let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.number(*column)).collect();
                    Column::new(name, values)
                } else {
                    let values: Vec<Option<String>> = self.rows.iter().map(|r| r.text(*column).map(String::from)).collect();
                    Column::new(name, values)
                }
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

fn text_at(table: &GeneTable, row: usize, name: &str) -> Option<String> {
    table.cell(row, name).map(Cell::to_string)
}

fn number_at(table: &GeneTable, row: usize, name: &str) -> Option<f64> {
    table.cell(row, name).and_then(Cell::as_number)
}

/// Turns the merged table into the final report: working columns removed,
/// columns of unavailable sources omitted, rows in merged-table order.
pub fn assemble(outcome: MergeOutcome, config: &PipelineConfig) -> Report {
    let MergeOutcome {
        mut table,
        availability,
        mismatches,
        collisions,
        duplicates_dropped,
        issues,
    } = outcome;

    let removed = table.drop_columns(&[fields::ABS_FOLD_CHANGE, fields::TRACTABILITY_RAW, fields::GENE_NAME]);
    table.dedup_columns();
    debug!("removed {} working columns, remaining {:?}", removed, table.column_names());

    let columns: Vec<ReportColumn> = ReportColumn::ALL.into_iter().filter(|c| availability.is_available(c.source())).collect();

    let rows = table
        .keys()
        .iter()
        .enumerate()
        .map(|(row, key)| MergedReportRow {
            gene_identifier: text_at(&table, row, fields::GENE_IDENTIFIER),
            gene: key.to_string(),
            fold_change: number_at(&table, row, fields::FOLD_CHANGE),
            tractability: text_at(&table, row, fields::TRACTABILITY),
            biotype: text_at(&table, row, fields::BIOTYPE),
            drugs: text_at(&table, row, fields::DRUGS),
            interaction_types: text_at(&table, row, fields::INTERACTION_TYPES),
            citations: text_at(&table, row, fields::CITATIONS),
            mean_interaction_score: number_at(&table, row, fields::MEAN_INTERACTION_SCORE),
            pathways: text_at(&table, row, fields::PATHWAYS),
        })
        .collect();

    Report {
        columns,
        rows,
        labels: config.labels.clone(),
        availability,
        mismatches,
        collisions,
        duplicates_dropped,
        issues,
    }
}
