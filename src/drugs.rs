use crate::model::DrugInteractionRecord;
use crate::normalize::{normalize, GeneKey};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use serde_derive::Serialize;

/// All interactions of one gene collapsed into one row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrugSummary {
    pub gene: GeneKey,
    /// Gene name as first spelled in the interaction table.
    pub gene_name: String,
    pub drugs: String,
    pub interaction_types: String,
    pub citations: String,
    /// Mean over every row with a numeric score, duplicates included.
    pub mean_score: Option<f64>,
    pub interactions: usize,
}

/// Sorted distinct values joined with `separator`.
fn join_distinct<'a>(values: impl Iterator<Item = &'a str>, separator: &str) -> String {
    values.map(str::trim).filter(|v| !v.is_empty()).sorted().dedup().join(separator)
}

/// Collapses interaction rows into one summary per gene, genes in order of
/// first appearance. Genes without any row do not appear at all.
pub fn aggregate(interactions: &[DrugInteractionRecord], citation_sentinel: &str, separator: &str) -> IndexMap<GeneKey, DrugSummary> {
    let mut groups: IndexMap<GeneKey, Vec<&DrugInteractionRecord>> = IndexMap::new();
    for interaction in interactions.iter() {
        let key = interaction.key();
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(interaction);
    }

    let summaries: IndexMap<GeneKey, DrugSummary> = groups
        .into_iter()
        .map(|(gene, rows)| {
            let scores: Vec<f64> = rows.iter().filter_map(|r| r.score).collect();
            let mean_score = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            };
            let summary = DrugSummary {
                gene_name: rows[0].gene_name.trim().to_string(),
                drugs: join_distinct(rows.iter().map(|r| r.drug_name.as_str()), separator),
                interaction_types: join_distinct(rows.iter().filter_map(|r| r.interaction_type.as_deref()), separator),
                citations: join_distinct(
                    rows.iter().filter_map(|r| r.citation_id.as_deref()).filter(|c| c.trim() != citation_sentinel),
                    separator,
                ),
                mean_score,
                interactions: rows.len(),
                gene: gene.clone(),
            };
            (gene, summary)
        })
        .collect();

    debug!("aggregated {} interactions into {} gene summaries", interactions.len(), summaries.len());
    summaries
}

/// Interactions whose gene is in `genes`, in table order.
pub fn interactions_for<'a>(genes: &[GeneKey], interactions: &'a [DrugInteractionRecord]) -> Vec<&'a DrugInteractionRecord> {
    interactions.iter().filter(|i| genes.contains(&normalize(&i.gene_name))).collect()
}
