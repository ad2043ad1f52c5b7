use crate::config::PipelineConfig;
use crate::drugs::interactions_for;
use crate::error::TractomeError;
use crate::model::{DrugInteractionRecord, GeneRecord, PathwayRecord};
use crate::pathways::{overlapping_genes, pathway_query_genes};
use crate::report::Report;
use log::{debug, info, warn};
use polars::prelude::{CsvWriter, SerWriter};
use serde_derive::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path;

fn create_parent(path: &path::Path) -> Result<(), TractomeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes the report as comma separated text, absent values as
/// `config.null_value` and empty ones as `""`. `read_table` does not map the
/// marker back: re-read, an absent value is the marker string.
pub fn write_report_csv(report: &Report, output: &path::PathBuf, config: &PipelineConfig) -> Result<(), TractomeError> {
    let mut df = report.to_data_frame()?;
    create_parent(output)?;
    let mut file = fs::File::create(output)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_null_value(config.null_value.clone())
        .finish(&mut df)?;
    info!("wrote {} report rows to {}", df.height(), output.to_string_lossy());
    Ok(())
}

#[derive(Debug, Serialize)]
struct PathwayGeneRow<'a> {
    #[serde(rename = "Pathway")]
    pathway: &'a str,
    #[serde(rename = "Gene ID")]
    identifier: Option<&'a str>,
    #[serde(rename = "Gene")]
    gene: &'a str,
    #[serde(rename = "log_2 fold change")]
    fold_change: Option<f64>,
    #[serde(rename = "abs log_2 fold change")]
    abs_fold_change: Option<f64>,
    #[serde(rename = "-log10(adjusted p)")]
    neg_log10_p: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PathwayDrugRow<'a> {
    #[serde(rename = "Pathway")]
    pathway: &'a str,
    #[serde(rename = "Gene")]
    gene: &'a str,
    #[serde(rename = "Drug")]
    drug: &'a str,
    #[serde(rename = "Interaction Type")]
    interaction_type: Option<&'a str>,
    #[serde(rename = "Interaction Score")]
    score: Option<f64>,
    #[serde(rename = "PMID")]
    citation_id: Option<&'a str>,
    #[serde(rename = "Source")]
    source: Option<&'a str>,
}

/// File-name stem for a pathway: anything outside `[A-Za-z0-9_-]` becomes `_`.
pub fn file_stem(pathway: &str) -> String {
    let stem: String = pathway
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "pathway".to_string()
    } else {
        stem
    }
}

/// `stem`, or `stem_2`, `stem_3`, ... when an earlier pathway already took it.
fn unique_stem(stem: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = stem.clone();
    let mut n = 1;
    while taken.contains(&candidate) {
        n += 1;
        candidate = format!("{}_{}", stem, n);
    }
    if n > 1 {
        warn!("pathway file name '{}' already used, writing '{}' instead", stem, candidate);
    }
    taken.insert(candidate.clone());
    candidate
}

/// Per pathway, the overlapping expression genes (largest absolute fold change
/// first) and, when interactions are given, their drug interactions. Returns
/// the files written.
pub fn write_pathway_tables(
    output_dir: &path::PathBuf,
    expression: &[GeneRecord],
    pathways: &[PathwayRecord],
    interactions: Option<&[DrugInteractionRecord]>,
) -> Result<Vec<path::PathBuf>, TractomeError> {
    fs::create_dir_all(output_dir)?;
    let mut written = vec![];
    let mut stems: HashSet<String> = HashSet::new();

    for pathway in pathways.iter() {
        let stem = unique_stem(file_stem(&pathway.name), &mut stems);
        let neg_log10_p = pathway.neg_log10_p();

        let genes_path = output_dir.join(format!("{}_genes.csv", stem));
        let mut writer = csv::WriterBuilder::new().has_headers(true).delimiter(b',').from_path(&genes_path)?;
        let genes = overlapping_genes(expression, pathway);
        for gene in genes.iter() {
            writer.serialize(PathwayGeneRow {
                pathway: &pathway.name,
                identifier: gene.identifier.as_deref(),
                gene: gene.name.trim(),
                fold_change: gene.fold_change,
                abs_fold_change: gene.abs_fold_change(),
                neg_log10_p,
            })?;
        }
        writer.flush()?;
        debug!("{}: {} genes", pathway.name, genes.len());
        written.push(genes_path);

        let Some(interactions) = interactions else {
            continue;
        };
        let drugs_path = output_dir.join(format!("{}_drugs.csv", stem));
        let mut writer = csv::WriterBuilder::new().has_headers(true).delimiter(b',').from_path(&drugs_path)?;
        let selected = interactions_for(&pathway_query_genes(expression, pathway), interactions);
        for interaction in selected.iter() {
            writer.serialize(PathwayDrugRow {
                pathway: &pathway.name,
                gene: interaction.gene_name.trim(),
                drug: interaction.drug_name.trim(),
                interaction_type: interaction.interaction_type.as_deref(),
                score: interaction.score,
                citation_id: interaction.citation_id.as_deref(),
                source: interaction.source.as_deref(),
            })?;
        }
        writer.flush()?;
        debug!("{}: {} drug interactions", pathway.name, selected.len());
        written.push(drugs_path);
    }

    info!("wrote {} pathway tables to {}", written.len(), output_dir.to_string_lossy());
    Ok(written)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::merge::PipelineContext;
    use crate::sources::read_table;
    use crate::build_report;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Apoptosis", "Apoptosis")]
    #[case("Cell cycle R-HSA-69278", "Cell_cycle_R-HSA-69278")]
    #[case(" p53 signaling/pathway ", "p53_signaling_pathway")]
    #[case("", "pathway")]
    fn pathway_file_stems(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(file_stem(name), expected);
    }

    fn scenario() -> PipelineContext {
        PipelineContext::new(vec![GeneRecord::new("ENSG1", "GENEA", 2.0), GeneRecord::new("ENSG2", "GENEB", -1.0)])
            .with_drug_interactions(vec![DrugInteractionRecord::new("GENEA", "X", "inhibitor", 0.5, "1")])
            .with_pathways(vec![PathwayRecord::new("P1", 0.01, &["GENEA"])])
    }

    fn text_at(df: &polars::prelude::DataFrame, column: &str, row: usize) -> Option<String> {
        df.column(column).unwrap().as_materialized_series().str().unwrap().get(row).map(String::from)
    }

    #[test]
    fn report_csv_reads_back() {
        let config = PipelineConfig::default();
        let report = build_report(&scenario(), &config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("report.csv");
        write_report_csv(&report, &output, &config).unwrap();

        let df = read_table(&output).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names_str(), report.column_labels());

        // never queried comes back as the marker, queried-but-empty as an empty string
        assert_eq!(text_at(&df, "Drug", 0), Some("X".to_string()));
        assert_eq!(text_at(&df, "Drug", 1), Some("NA".to_string()));
        assert_eq!(text_at(&df, "Interaction Score", 1), Some("NA".to_string()));
        assert_eq!(text_at(&df, "Pathways", 0), Some("P1".to_string()));
        assert_eq!(text_at(&df, "Pathways", 1), Some("".to_string()));

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.lines().nth(2).unwrap().ends_with(",NA,NA,NA,NA,\"\""), "{}", content);
    }

    #[test]
    fn report_csv_is_byte_identical_across_runs() {
        let config = PipelineConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        write_report_csv(&build_report(&scenario(), &config).unwrap(), &first, &config).unwrap();
        write_report_csv(&build_report(&scenario(), &config).unwrap(), &second, &config).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn colliding_pathway_names_get_distinct_files() {
        let expression = vec![GeneRecord::new("E1", "GENEA", 1.0)];
        let pathways = vec![
            PathwayRecord::new("p53/x", 0.01, &["GENEA"]),
            PathwayRecord::new("p53_x", 0.02, &["GENEA"]),
            PathwayRecord::new("p53 x", 0.03, &["GENEA"]),
        ];
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_path_buf();
        let written = write_pathway_tables(&output_dir, &expression, &pathways, None).unwrap();
        assert_eq!(
            written,
            vec![output_dir.join("p53_x_genes.csv"), output_dir.join("p53_x_2_genes.csv"), output_dir.join("p53_x_3_genes.csv")]
        );
        assert!(fs::read_to_string(&written[1]).unwrap().contains("p53_x,E1,GENEA"));
    }

    #[test]
    fn pathway_tables_written_per_pathway() {
        let expression = vec![
            GeneRecord::new("E1", "GENEA", 1.0),
            GeneRecord::new("E2", "GENEB", -3.0),
            GeneRecord::new("E3", "GENEC", 2.0),
        ];
        let pathways = vec![PathwayRecord::new("Path one", 0.01, &["GENEA", "GENEB"]), PathwayRecord::new("Two", 0.5, &["GENEC"])];
        let interactions = vec![
            DrugInteractionRecord::new("GENEB", "DRUGB", "inhibitor", 1.0, "11"),
            DrugInteractionRecord::new("GENEC", "DRUGC", "agonist", 1.0, "12"),
        ];

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_path_buf();
        let written = write_pathway_tables(&output_dir, &expression, &pathways, Some(&interactions)).unwrap();
        let names: Vec<String> = written.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();
        assert_eq!(names, vec!["Path_one_genes.csv", "Path_one_drugs.csv", "Two_genes.csv", "Two_drugs.csv"]);

        let genes = fs::read_to_string(output_dir.join("Path_one_genes.csv")).unwrap();
        let rows: Vec<&str> = genes.lines().collect();
        assert_eq!(rows[0], "Pathway,Gene ID,Gene,log_2 fold change,abs log_2 fold change,-log10(adjusted p)");
        assert!(rows[1].starts_with("Path one,E2,GENEB,"));
        assert!(rows[2].starts_with("Path one,E1,GENEA,"));

        let drugs = fs::read_to_string(output_dir.join("Path_one_drugs.csv")).unwrap();
        assert_eq!(drugs.lines().count(), 2);
        assert!(drugs.contains("DRUGB"));
        assert!(!drugs.contains("DRUGC"));
    }

    #[test]
    fn drug_tables_skipped_without_interactions() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_path_buf();
        let written = write_pathway_tables(&output_dir, &[GeneRecord::new("E1", "GENEA", 1.0)], &[PathwayRecord::new("P", 0.01, &["GENEA"])], None).unwrap();
        assert_eq!(written, vec![output_dir.join("P_genes.csv")]);
    }
}
