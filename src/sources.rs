use crate::config::PipelineConfig;
use crate::error::{SchemaIssue, SourceKind, TractomeError};
use crate::model::{DrugInteractionRecord, GeneRecord, Overlap, PathwayRecord, TractabilityRecord};
use log::{debug, warn};
use polars::prelude::*;
use serde_derive::Serialize;
use std::path;

/// A source table after loading: its records, or the reason it is missing.
#[derive(Debug)]
pub enum SourceData<T> {
    Available(Vec<T>),
    Unavailable(TractomeError),
}

impl<T> SourceData<T> {
    pub fn records(&self) -> Option<&[T]> {
        match self {
            SourceData::Available(records) => Some(records),
            SourceData::Unavailable(_) => None,
        }
    }

    pub fn status(&self) -> SourceStatus {
        match self {
            SourceData::Available(records) => SourceStatus::Available { rows: records.len() },
            SourceData::Unavailable(reason) => SourceStatus::Unavailable { reason: reason.to_string() },
        }
    }
}

impl<T> From<Vec<T>> for SourceData<T> {
    fn from(records: Vec<T>) -> Self {
        SourceData::Available(records)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Available { rows: usize },
    Unavailable { reason: String },
}

impl SourceStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, SourceStatus::Available { .. })
    }
}

/// Per-source flags telling "queried, nothing found" apart from "never merged".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceAvailability {
    pub expression: SourceStatus,
    pub tractability: SourceStatus,
    pub pathways: SourceStatus,
    pub drug_interactions: SourceStatus,
}

impl SourceAvailability {
    pub fn get(&self, kind: SourceKind) -> &SourceStatus {
        match kind {
            SourceKind::Expression => &self.expression,
            SourceKind::Tractability => &self.tractability,
            SourceKind::Pathways => &self.pathways,
            SourceKind::DrugInteractions => &self.drug_interactions,
        }
    }

    pub fn is_available(&self, kind: SourceKind) -> bool {
        self.get(kind).is_available()
    }
}

/// Records converted from one frame plus the field-level problems met on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub issues: Vec<SchemaIssue>,
}

/// Reads a delimited file with every column as text. `.tsv`, `.tab` and
/// `.txt` files are tab separated, anything else comma separated.
pub fn read_table(path: &path::PathBuf) -> Result<DataFrame, TractomeError> {
    let separator = match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") | Some("tab") | Some("txt") => b'\t',
        _ => b',',
    };

    let df = LazyCsvReader::new(path.clone())
        .with_separator(separator)
        .with_infer_schema_length(Some(0))
        .with_ignore_errors(true)
        .with_truncate_ragged_lines(true)
        .with_has_header(true)
        .finish()?
        .collect()?;

    debug!("Shape of {} is {:?}", path.to_string_lossy(), df.shape());
    Ok(df)
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names_str().contains(&name)
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, TractomeError> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.map(str::trim).filter(|v| !v.is_empty()).map(String::from))
        .collect();
    Ok(values)
}

fn required_column(df: &DataFrame, kind: SourceKind, name: &str) -> Result<Vec<Option<String>>, TractomeError> {
    if !has_column(df, name) {
        return Err(TractomeError::missing_column(kind, name));
    }
    text_column(df, name)
}

fn optional_column(df: &DataFrame, kind: SourceKind, name: &str) -> Result<Vec<Option<String>>, TractomeError> {
    if has_column(df, name) {
        text_column(df, name)
    } else {
        warn!("{} source has no '{}' column, its values stay empty", kind, name);
        Ok(vec![None; df.height()])
    }
}

struct IssueLog {
    kind: SourceKind,
    issues: Vec<SchemaIssue>,
}

impl IssueLog {
    fn new(kind: SourceKind) -> Self {
        Self { kind, issues: vec![] }
    }

    fn push(&mut self, row: usize, column: &str, value: &str, reason: &str) {
        let issue = SchemaIssue {
            source: self.kind,
            row,
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        debug!("{}", issue);
        self.issues.push(issue);
    }

    fn number(&mut self, row: usize, column: &str, value: Option<String>) -> Option<f64> {
        let value = value?;
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Some(number),
            _ => {
                self.push(row, column, &value, "not a finite number");
                None
            }
        }
    }

    fn finish<T>(self, records: Vec<T>) -> Loaded<T> {
        if !self.issues.is_empty() {
            warn!("{} source: {} field(s) violate their column type", self.kind, self.issues.len());
        }
        Loaded { records, issues: self.issues }
    }
}

/// Splits a tractability tag cell. Accepts a delimited list or a bracketed
/// list literal such as `['Approved Drug', 'Small molecule']`.
pub fn parse_tags(raw: &str, delimiter: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let (body, delimiter) = match trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(body) => (body, ","),
        None => (trimmed, delimiter),
    };
    if body.eq_ignore_ascii_case("nan") {
        return vec![];
    }
    body.split(delimiter)
        .map(|tag| tag.trim().trim_matches(|c| c == '\'' || c == '"').trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub fn split_members(raw: &str, delimiter: &str) -> Vec<String> {
    raw.split(delimiter).map(str::trim).filter(|g| !g.is_empty()).map(String::from).collect()
}

pub fn expression_from_frame(df: &DataFrame, config: &PipelineConfig) -> Result<Loaded<GeneRecord>, TractomeError> {
    let kind = SourceKind::Expression;
    let columns = &config.expression;
    let names = required_column(df, kind, &columns.gene_name)?;
    let identifiers = optional_column(df, kind, &columns.gene_identifier)?;
    let fold_changes = optional_column(df, kind, &columns.fold_change)?;

    let mut log = IssueLog::new(kind);
    let mut records = Vec::with_capacity(names.len());
    for (row, ((name, identifier), fold_change)) in names.into_iter().zip(identifiers).zip(fold_changes).enumerate() {
        let Some(name) = name else {
            log.push(row, &columns.gene_name, "", "blank gene name, row skipped");
            continue;
        };
        let fold_change = log.number(row, &columns.fold_change, fold_change);
        records.push(GeneRecord { identifier, name, fold_change });
    }
    Ok(log.finish(records))
}

pub fn tractability_from_frame(df: &DataFrame, config: &PipelineConfig) -> Result<Loaded<TractabilityRecord>, TractomeError> {
    let kind = SourceKind::Tractability;
    let columns = &config.tractability;
    let names = required_column(df, kind, &columns.gene_name)?;
    let identifiers = optional_column(df, kind, &columns.gene_identifier)?;
    let tags = optional_column(df, kind, &columns.tags)?;
    let biotypes = optional_column(df, kind, &columns.biotype)?;

    let mut log = IssueLog::new(kind);
    let mut records = Vec::with_capacity(names.len());
    for (row, (((name, identifier), raw_tags), biotype)) in names.into_iter().zip(identifiers).zip(tags).zip(biotypes).enumerate() {
        let Some(gene_name) = name else {
            log.push(row, &columns.gene_name, "", "blank gene name, row skipped");
            continue;
        };
        records.push(TractabilityRecord {
            identifier,
            gene_name,
            tags: raw_tags.as_deref().map(|t| parse_tags(t, &config.tag_delimiter)).unwrap_or_default(),
            biotype,
            raw_tags,
        });
    }
    Ok(log.finish(records))
}

pub fn pathways_from_frame(df: &DataFrame, config: &PipelineConfig) -> Result<Loaded<PathwayRecord>, TractomeError> {
    let kind = SourceKind::Pathways;
    let columns = &config.pathways;
    let names = required_column(df, kind, &columns.pathway_name)?;
    let members = required_column(df, kind, &columns.member_genes)?;
    let p_values = optional_column(df, kind, &columns.adjusted_p_value)?;
    let overlaps = optional_column(df, kind, &columns.overlap)?;
    let percents = optional_column(df, kind, &columns.input_percent)?;
    let sums = optional_column(df, kind, &columns.fold_change_sum)?;

    let mut log = IssueLog::new(kind);
    let mut records = Vec::with_capacity(names.len());
    let rows = names.into_iter().zip(members).zip(p_values).zip(overlaps).zip(percents).zip(sums).enumerate();
    for (row, (((((name, genes), p_value), overlap), percent), sum)) in rows {
        let Some(name) = name else {
            log.push(row, &columns.pathway_name, "", "blank pathway name, row skipped");
            continue;
        };
        let overlap = overlap.and_then(|raw| match raw.parse::<Overlap>() {
            Ok(overlap) => Some(overlap),
            Err(reason) => {
                log.push(row, &columns.overlap, &raw, &reason);
                None
            }
        });
        let percent = percent.map(|raw| raw.trim_end_matches('%').trim().to_string());
        records.push(PathwayRecord {
            name,
            adjusted_p_value: log.number(row, &columns.adjusted_p_value, p_value),
            overlap,
            input_percent: log.number(row, &columns.input_percent, percent),
            fold_change_sum: log.number(row, &columns.fold_change_sum, sum),
            genes: genes.map(|g| split_members(&g, &config.member_delimiter)).unwrap_or_default(),
        });
    }
    Ok(log.finish(records))
}

pub fn drug_interactions_from_frame(df: &DataFrame, config: &PipelineConfig) -> Result<Loaded<DrugInteractionRecord>, TractomeError> {
    let kind = SourceKind::DrugInteractions;
    let columns = &config.drug_interactions;
    let genes = required_column(df, kind, &columns.gene_name)?;
    let drugs = required_column(df, kind, &columns.drug_name)?;
    let types = optional_column(df, kind, &columns.interaction_type)?;
    let scores = optional_column(df, kind, &columns.score)?;
    let citations = optional_column(df, kind, &columns.citation_id)?;
    let sources = optional_column(df, kind, &columns.source)?;

    let mut log = IssueLog::new(kind);
    let mut records = Vec::with_capacity(genes.len());
    let rows = genes.into_iter().zip(drugs).zip(types).zip(scores).zip(citations).zip(sources).enumerate();
    for (row, (((((gene, drug), interaction_type), score), citation_id), source)) in rows {
        let (Some(gene_name), Some(drug_name)) = (gene, drug) else {
            log.push(row, &columns.gene_name, "", "blank gene or drug name, row skipped");
            continue;
        };
        records.push(DrugInteractionRecord {
            gene_name,
            drug_name,
            interaction_type,
            score: log.number(row, &columns.score, score),
            citation_id,
            source,
        });
    }
    Ok(log.finish(records))
}
