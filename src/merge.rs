use crate::config::PipelineConfig;
use crate::drugs::{self, DrugSummary};
use crate::error::{KeyMismatch, SchemaIssue, SourceKind, TractomeError};
use crate::model::{DrugInteractionRecord, GeneRecord, PathwayRecord, TractabilityRecord};
use crate::normalize::GeneKey;
use crate::pathways::PathwayMembershipIndex;
use crate::sources::{self, read_table, Loaded, SourceAvailability, SourceData};
use crate::table::{Cell, ColumnCollision, GeneTable, JoinOutcome};
use indexmap::IndexMap;
use log::{debug, info, warn};
use polars::prelude::DataFrame;
use std::path;

/// Internal column names of the merged table.
pub mod fields {
    pub const GENE_IDENTIFIER: &str = "gene_identifier";
    pub const GENE_NAME: &str = "gene_name";
    pub const FOLD_CHANGE: &str = "fold_change";
    pub const ABS_FOLD_CHANGE: &str = "abs_fold_change";
    pub const TRACTABILITY: &str = "tractability";
    pub const TRACTABILITY_RAW: &str = "tractability_raw";
    pub const BIOTYPE: &str = "biotype";
    pub const DRUGS: &str = "drugs";
    pub const INTERACTION_TYPES: &str = "interaction_types";
    pub const CITATIONS: &str = "citations";
    pub const MEAN_INTERACTION_SCORE: &str = "mean_interaction_score";
    pub const PATHWAYS: &str = "pathways";
}

#[derive(Debug, Default)]
pub struct SourceFrames<'a> {
    pub expression: Option<&'a DataFrame>,
    pub tractability: Option<&'a DataFrame>,
    pub pathways: Option<&'a DataFrame>,
    pub drug_interactions: Option<&'a DataFrame>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourcePaths {
    pub expression: Option<path::PathBuf>,
    pub tractability: Option<path::PathBuf>,
    pub pathways: Option<path::PathBuf>,
    pub drug_interactions: Option<path::PathBuf>,
}

/// Everything one merge run reads. Nothing is cached between runs.
#[derive(Debug)]
pub struct PipelineContext {
    pub expression: SourceData<GeneRecord>,
    pub tractability: SourceData<TractabilityRecord>,
    pub pathways: SourceData<PathwayRecord>,
    pub drug_interactions: SourceData<DrugInteractionRecord>,
    pub issues: Vec<SchemaIssue>,
}

fn load_source<T>(
    kind: SourceKind,
    frame: Option<&DataFrame>,
    config: &PipelineConfig,
    adapter: fn(&DataFrame, &PipelineConfig) -> Result<Loaded<T>, TractomeError>,
    issues: &mut Vec<SchemaIssue>,
) -> Result<SourceData<T>, TractomeError> {
    let Some(frame) = frame else {
        warn!("{} source not supplied", kind);
        return Ok(SourceData::Unavailable(TractomeError::not_supplied(kind)));
    };
    match adapter(frame, config) {
        Ok(loaded) => {
            debug!("{} source: {} records", kind, loaded.records.len());
            issues.extend(loaded.issues);
            Ok(SourceData::Available(loaded.records))
        }
        Err(e @ TractomeError::MissingSource { .. }) => {
            warn!("{}", e);
            Ok(SourceData::Unavailable(e))
        }
        Err(e) => Err(e),
    }
}

fn load_path<T>(
    kind: SourceKind,
    path: Option<&path::PathBuf>,
    config: &PipelineConfig,
    adapter: fn(&DataFrame, &PipelineConfig) -> Result<Loaded<T>, TractomeError>,
    issues: &mut Vec<SchemaIssue>,
) -> Result<SourceData<T>, TractomeError> {
    let Some(path) = path else {
        return load_source(kind, None, config, adapter, issues);
    };
    match read_table(path) {
        Ok(frame) => load_source(kind, Some(&frame), config, adapter, issues),
        Err(e) => {
            let e = TractomeError::unreadable(kind, path, &e);
            warn!("{}", e);
            Ok(SourceData::Unavailable(e))
        }
    }
}

impl PipelineContext {
    /// A context with only the expression table; the other sources start out unavailable.
    pub fn new(expression: Vec<GeneRecord>) -> Self {
        Self {
            expression: SourceData::Available(expression),
            tractability: SourceData::Unavailable(TractomeError::not_supplied(SourceKind::Tractability)),
            pathways: SourceData::Unavailable(TractomeError::not_supplied(SourceKind::Pathways)),
            drug_interactions: SourceData::Unavailable(TractomeError::not_supplied(SourceKind::DrugInteractions)),
            issues: vec![],
        }
    }

    pub fn with_tractability(mut self, records: Vec<TractabilityRecord>) -> Self {
        self.tractability = SourceData::Available(records);
        self
    }

    pub fn with_pathways(mut self, records: Vec<PathwayRecord>) -> Self {
        self.pathways = SourceData::Available(records);
        self
    }

    pub fn with_drug_interactions(mut self, records: Vec<DrugInteractionRecord>) -> Self {
        self.drug_interactions = SourceData::Available(records);
        self
    }

    pub fn from_frames(frames: SourceFrames, config: &PipelineConfig) -> Result<Self, TractomeError> {
        let mut issues = vec![];
        let expression = load_source(SourceKind::Expression, frames.expression, config, sources::expression_from_frame, &mut issues)?;
        let tractability = load_source(SourceKind::Tractability, frames.tractability, config, sources::tractability_from_frame, &mut issues)?;
        let pathways = load_source(SourceKind::Pathways, frames.pathways, config, sources::pathways_from_frame, &mut issues)?;
        let drug_interactions = load_source(
            SourceKind::DrugInteractions,
            frames.drug_interactions,
            config,
            sources::drug_interactions_from_frame,
            &mut issues,
        )?;
        Ok(Self {
            expression,
            tractability,
            pathways,
            drug_interactions,
            issues,
        })
    }

    /// Reads the given files. An expression file that cannot be read fails the
    /// run; any other unreadable file leaves its source unavailable.
    pub fn from_paths(paths: &SourcePaths, config: &PipelineConfig) -> Result<Self, TractomeError> {
        let mut issues = vec![];
        let expression = paths.expression.as_ref().map(read_table).transpose()?;
        let expression = load_source(SourceKind::Expression, expression.as_ref(), config, sources::expression_from_frame, &mut issues)?;
        let tractability = load_path(
            SourceKind::Tractability,
            paths.tractability.as_ref(),
            config,
            sources::tractability_from_frame,
            &mut issues,
        )?;
        let pathways = load_path(SourceKind::Pathways, paths.pathways.as_ref(), config, sources::pathways_from_frame, &mut issues)?;
        let drug_interactions = load_path(
            SourceKind::DrugInteractions,
            paths.drug_interactions.as_ref(),
            config,
            sources::drug_interactions_from_frame,
            &mut issues,
        )?;
        Ok(Self {
            expression,
            tractability,
            pathways,
            drug_interactions,
            issues,
        })
    }

    pub fn availability(&self) -> SourceAvailability {
        SourceAvailability {
            expression: self.expression.status(),
            tractability: self.tractability.status(),
            pathways: self.pathways.status(),
            drug_interactions: self.drug_interactions.status(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub table: GeneTable,
    pub availability: SourceAvailability,
    pub mismatches: Vec<KeyMismatch>,
    pub collisions: Vec<ColumnCollision>,
    /// Rows removed per source because their key was already taken.
    pub duplicates_dropped: IndexMap<SourceKind, usize>,
    pub issues: Vec<SchemaIssue>,
}

fn text(value: &str) -> Option<Cell> {
    Some(Cell::Text(value.to_string()))
}

fn expression_table(records: &[GeneRecord]) -> Result<GeneTable, TractomeError> {
    GeneTable::new(records.iter().map(GeneRecord::key).collect())
        .with_column(fields::GENE_IDENTIFIER, records.iter().map(|r| r.identifier.as_deref().and_then(text)).collect())?
        .with_column(fields::GENE_NAME, records.iter().map(|r| text(r.name.trim())).collect())?
        .with_column(fields::FOLD_CHANGE, records.iter().map(|r| r.fold_change.map(Cell::Number)).collect())?
        .with_column(fields::ABS_FOLD_CHANGE, records.iter().map(|r| r.abs_fold_change().map(Cell::Number)).collect())
}

fn tractability_table(records: &[TractabilityRecord], separator: &str) -> Result<GeneTable, TractomeError> {
    GeneTable::new(records.iter().map(TractabilityRecord::key).collect())
        .with_column(fields::GENE_IDENTIFIER, records.iter().map(|r| r.identifier.as_deref().and_then(text)).collect())?
        .with_column(fields::GENE_NAME, records.iter().map(|r| text(r.gene_name.trim())).collect())?
        .with_column(
            fields::TRACTABILITY,
            // no tag cell at all stays absent; a blank list is an empty value
            records.iter().map(|r| r.raw_tags.as_ref().map(|_| Cell::Text(r.tags.join(separator)))).collect(),
        )?
        .with_column(fields::TRACTABILITY_RAW, records.iter().map(|r| r.raw_tags.as_deref().and_then(text)).collect())?
        .with_column(fields::BIOTYPE, records.iter().map(|r| r.biotype.as_deref().and_then(text)).collect())
}

fn drug_summary_table(summaries: &IndexMap<GeneKey, DrugSummary>) -> Result<GeneTable, TractomeError> {
    let rows: Vec<&DrugSummary> = summaries.values().collect();
    GeneTable::new(summaries.keys().cloned().collect())
        .with_column(fields::GENE_NAME, rows.iter().map(|s| text(&s.gene_name)).collect())?
        .with_column(fields::DRUGS, rows.iter().map(|s| text(&s.drugs)).collect())?
        .with_column(fields::INTERACTION_TYPES, rows.iter().map(|s| text(&s.interaction_types)).collect())?
        .with_column(fields::CITATIONS, rows.iter().map(|s| text(&s.citations)).collect())?
        .with_column(fields::MEAN_INTERACTION_SCORE, rows.iter().map(|s| s.mean_score.map(Cell::Number)).collect())
}

#[derive(Default)]
struct MergeLog {
    mismatches: Vec<KeyMismatch>,
    collisions: Vec<ColumnCollision>,
    duplicates_dropped: IndexMap<SourceKind, usize>,
}

impl MergeLog {
    fn unique(&mut self, kind: SourceKind, table: GeneTable) -> GeneTable {
        let (table, dropped) = table.unique_by_key();
        if dropped > 0 {
            warn!("{} source: kept the first of several rows for {} duplicated gene names", kind, dropped);
            self.duplicates_dropped.insert(kind, dropped);
        }
        table
    }

    fn joined(&mut self, kind: SourceKind, outcome: JoinOutcome) -> GeneTable {
        if !outcome.unmatched.is_empty() {
            info!("{} of {} genes have no {} match", outcome.unmatched.len(), outcome.table.len(), kind);
        }
        self.mismatches.extend(outcome.unmatched.into_iter().map(|gene| KeyMismatch { source: kind, gene }));
        self.collisions.extend(outcome.collisions);
        outcome.table
    }
}

/// Left-joins tractability and drug summaries onto the expression genes and
/// attaches pathway membership. Unavailable sources are skipped and flagged in
/// the outcome's availability; the result has one row per distinct
/// expression gene, in expression order.
pub fn merge(ctx: &PipelineContext, config: &PipelineConfig) -> Result<MergeOutcome, TractomeError> {
    let availability = ctx.availability();
    let mut log = MergeLog::default();

    let expression = ctx.expression.records().unwrap_or_else(|| {
        warn!("expression source unavailable, the merged table is empty");
        &[]
    });
    let mut table = log.unique(SourceKind::Expression, expression_table(expression)?);

    if let Some(records) = ctx.tractability.records() {
        let right = log.unique(SourceKind::Tractability, tractability_table(records, &config.display_separator)?);
        table = log.joined(SourceKind::Tractability, table.left_join(&right, config.collision_policy)?);
    }

    if let Some(records) = ctx.drug_interactions.records() {
        let summaries = drugs::aggregate(records, &config.citation_sentinel, &config.display_separator);
        let right = drug_summary_table(&summaries)?;
        table = log.joined(SourceKind::DrugInteractions, table.left_join(&right, config.collision_policy)?);
    }

    if let Some(records) = ctx.pathways.records() {
        let index = PathwayMembershipIndex::build(records);
        let cells = table.keys().iter().map(|k| text(&index.membership_of_key(k).join(&config.display_separator))).collect();
        table.append_column(fields::PATHWAYS, cells)?;
    }

    table.dedup_columns();
    debug!("merged table: {} rows, columns {:?}", table.len(), table.column_names());

    Ok(MergeOutcome {
        table,
        availability,
        mismatches: log.mismatches,
        collisions: log.collisions,
        duplicates_dropped: log.duplicates_dropped,
        issues: ctx.issues.clone(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::normalize::normalize;
    use crate::table::Resolution;
    use polars::prelude::df;
    use pretty_assertions::assert_eq;

    fn scenario() -> PipelineContext {
        PipelineContext::new(vec![GeneRecord::new("ENSG1", "GENEA", 2.0), GeneRecord::new("ENSG2", "GENEB", -1.0)])
            .with_tractability(vec![TractabilityRecord::new("GENEA", &["Approved Drug"], "protein_coding")])
            .with_drug_interactions(vec![])
            .with_pathways(vec![PathwayRecord::new("PathwayX", 0.01, &["GENEA", "GENEC"])])
    }

    #[test]
    fn one_row_per_expression_gene() {
        let ctx = PipelineContext::new(vec![
            GeneRecord::new("ENSG1", "GENEA", 2.0),
            GeneRecord::new("ENSG2", "GENEB", 1.0),
            GeneRecord::new("ENSG3", "genea", 0.5),
        ])
        .with_pathways(vec![PathwayRecord::new("P1", 0.01, &["GENEA"]), PathwayRecord::new("P2", 0.02, &["GENEA", "GENEB"])])
        .with_drug_interactions(vec![
            DrugInteractionRecord::new("GENEA", "X", "inhibitor", 1.0, "1"),
            DrugInteractionRecord::new("GENEA", "Y", "inhibitor", 2.0, "2"),
            DrugInteractionRecord::new("GENEB", "X", "inhibitor", 1.0, "1"),
        ]);
        let outcome = merge(&ctx, &PipelineConfig::default()).unwrap();

        assert_eq!(outcome.table.keys(), &[normalize("GENEA"), normalize("GENEB")]);
        assert_eq!(outcome.duplicates_dropped.get(&SourceKind::Expression), Some(&1));
        assert_eq!(outcome.table.cell(0, fields::GENE_IDENTIFIER), Some(&Cell::Text("ENSG1".into())));
        assert_eq!(outcome.table.cell(0, fields::PATHWAYS), Some(&Cell::Text("P1; P2".into())));
        assert_eq!(outcome.table.cell(0, fields::DRUGS), Some(&Cell::Text("X; Y".into())));
        assert_eq!(outcome.table.cell(1, fields::MEAN_INTERACTION_SCORE), Some(&Cell::Number(1.0)));
    }

    #[test]
    fn scenario_merge() {
        let outcome = merge(&scenario(), &PipelineConfig::default()).unwrap();
        let table = &outcome.table;

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, fields::TRACTABILITY), Some(&Cell::Text("Approved Drug".into())));
        assert_eq!(table.cell(0, fields::BIOTYPE), Some(&Cell::Text("protein_coding".into())));
        assert_eq!(table.cell(0, fields::PATHWAYS), Some(&Cell::Text("PathwayX".into())));
        assert_eq!(table.cell(0, fields::DRUGS), None);

        assert_eq!(table.cell(1, fields::TRACTABILITY), None);
        assert_eq!(table.cell(1, fields::BIOTYPE), None);
        assert_eq!(table.cell(1, fields::PATHWAYS), Some(&Cell::Text("".into())));
        assert_eq!(table.cell(1, fields::DRUGS), None);

        assert!(outcome.availability.is_available(SourceKind::DrugInteractions));
        assert_eq!(
            outcome.mismatches,
            vec![
                KeyMismatch {
                    source: SourceKind::Tractability,
                    gene: normalize("GENEB"),
                },
                KeyMismatch {
                    source: SourceKind::DrugInteractions,
                    gene: normalize("GENEA"),
                },
                KeyMismatch {
                    source: SourceKind::DrugInteractions,
                    gene: normalize("GENEB"),
                },
            ]
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let ctx = scenario();
        let config = PipelineConfig::default();
        assert_eq!(merge(&ctx, &config).unwrap(), merge(&ctx, &config).unwrap());
    }

    #[test]
    fn duplicate_tractability_rows_keep_first_seen() {
        let ctx = PipelineContext::new(vec![GeneRecord::new("ENSG1", "GENEA", 2.0)]).with_tractability(vec![
            TractabilityRecord::new("genea", &["Approved Drug"], "protein_coding"),
            TractabilityRecord::new("GENEA", &["Antibody"], "lncRNA"),
        ]);
        let outcome = merge(&ctx, &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.table.cell(0, fields::TRACTABILITY), Some(&Cell::Text("Approved Drug".into())));
        assert_eq!(outcome.duplicates_dropped.get(&SourceKind::Tractability), Some(&1));
    }

    #[test]
    fn identifier_collision_falls_back_when_expression_has_none() {
        let mut gene = GeneRecord::new("", "GENEA", 1.0);
        gene.identifier = None;
        let mut tractability = TractabilityRecord::new("GENEA", &[], "protein_coding");
        tractability.identifier = Some("ENSG9".into());
        let ctx = PipelineContext::new(vec![gene]).with_tractability(vec![tractability]);

        let outcome = merge(&ctx, &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.table.cell(0, fields::GENE_IDENTIFIER), Some(&Cell::Text("ENSG9".into())));
        let identifier = outcome.collisions.iter().find(|c| c.column == fields::GENE_IDENTIFIER).unwrap();
        assert_eq!(identifier.resolution, Resolution::TookRight);
        // queried with no tags is an empty value, not an absent one
        assert_eq!(outcome.table.cell(0, fields::TRACTABILITY), Some(&Cell::Text("".into())));
    }

    #[test]
    fn unavailable_sources_are_skipped_and_flagged() {
        let outcome = merge(&PipelineContext::new(vec![GeneRecord::new("ENSG1", "GENEA", 2.0)]), &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.table.column_names(), vec![fields::GENE_IDENTIFIER, fields::GENE_NAME, fields::FOLD_CHANGE, fields::ABS_FOLD_CHANGE]);
        assert!(!outcome.availability.is_available(SourceKind::Tractability));
        assert!(!outcome.availability.is_available(SourceKind::Pathways));
        assert!(!outcome.availability.is_available(SourceKind::DrugInteractions));
        assert!(outcome.mismatches.is_empty());
    }

    #[test]
    fn frames_missing_key_columns_degrade_instead_of_failing() {
        let expression = df!(
            "Gene" => &["ENSG1", "ENSG2"],
            "Gene Name" => &["GENEA", "GENEB"],
            "log_2 fold change" => &["2.0", "-1.0"],
        )
        .unwrap();
        let drugs = df!("Drug" => &["X"], "Interaction Score" => &["1.0"]).unwrap();
        let pathways = df!("Term" => &["PathwayX"], "Genes" => &["GENEA;GENEC"]).unwrap();
        let frames = SourceFrames {
            expression: Some(&expression),
            tractability: None,
            pathways: Some(&pathways),
            drug_interactions: Some(&drugs),
        };
        let ctx = PipelineContext::from_frames(frames, &PipelineConfig::default()).unwrap();
        let outcome = merge(&ctx, &PipelineConfig::default()).unwrap();

        assert_eq!(outcome.table.len(), 2);
        assert!(outcome.availability.is_available(SourceKind::Pathways));
        match outcome.availability.get(SourceKind::DrugInteractions) {
            crate::sources::SourceStatus::Unavailable { reason } => assert!(reason.contains("'Gene'")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(outcome.table.column(fields::DRUGS).is_none());
    }

    #[test]
    fn missing_expression_yields_empty_table() {
        let ctx = PipelineContext::from_frames(SourceFrames::default(), &PipelineConfig::default()).unwrap();
        let outcome = merge(&ctx, &PipelineConfig::default()).unwrap();
        assert!(outcome.table.is_empty());
        assert!(!outcome.availability.is_available(SourceKind::Expression));
    }

    #[test]
    fn unreadable_optional_files_leave_sources_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let expression = dir.path().join("genes.csv");
        std::fs::write(&expression, "Gene,Gene Name,log_2 fold change\nENSG1,GENEA,2.0\nENSG2,GENEB,-1.0\n").unwrap();
        let tractability = dir.path().join("tractability.csv");
        std::fs::write(&tractability, "").unwrap();
        let paths = SourcePaths {
            expression: Some(expression),
            tractability: Some(tractability),
            drug_interactions: Some(dir.path().join("missing_drugs.csv")),
            ..Default::default()
        };

        let ctx = PipelineContext::from_paths(&paths, &PipelineConfig::default()).unwrap();
        let outcome = merge(&ctx, &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.table.len(), 2);
        for kind in [SourceKind::Tractability, SourceKind::DrugInteractions] {
            match outcome.availability.get(kind) {
                crate::sources::SourceStatus::Unavailable { reason } => assert!(reason.contains("unreadable"), "{}", reason),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(outcome.table.column(fields::TRACTABILITY).is_none());
        assert!(outcome.table.column(fields::DRUGS).is_none());
    }

    #[test]
    fn unreadable_expression_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SourcePaths {
            expression: Some(dir.path().join("missing_genes.csv")),
            ..Default::default()
        };
        assert!(PipelineContext::from_paths(&paths, &PipelineConfig::default()).is_err());
    }

    #[test]
    fn tractability_without_tag_column_stays_absent() {
        let expression = df!("Gene Name" => &["GENEA"], "log_2 fold change" => &["2.0"]).unwrap();
        let tractability = df!("Gene Symbol" => &["GENEA"]).unwrap();
        let frames = SourceFrames {
            expression: Some(&expression),
            tractability: Some(&tractability),
            ..Default::default()
        };
        let ctx = PipelineContext::from_frames(frames, &PipelineConfig::default()).unwrap();
        let outcome = merge(&ctx, &PipelineConfig::default()).unwrap();

        assert!(outcome.availability.is_available(SourceKind::Tractability));
        assert!(outcome.table.column(fields::TRACTABILITY).is_some());
        assert_eq!(outcome.table.cell(0, fields::TRACTABILITY), None);
    }
}
