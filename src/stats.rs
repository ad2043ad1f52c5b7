use crate::model::{DrugInteractionRecord, GeneRecord, TractabilityRecord};
use indexmap::IndexMap;
use itertools::Itertools;
use serde_derive::Serialize;
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Count {
    pub value: String,
    pub count: usize,
}

/// Most frequent first, ties alphabetical.
fn counted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<Count> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .counts()
        .into_iter()
        .map(|(value, count)| Count {
            value: value.to_string(),
            count,
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneFoldChange {
    pub gene: String,
    pub fold_change: f64,
}

/// Fold change summed per gene display name, largest first.
pub fn fold_change_by_gene(expression: &[GeneRecord]) -> Vec<GeneFoldChange> {
    let mut sums: IndexMap<&str, f64> = IndexMap::new();
    for gene in expression.iter() {
        if let Some(fold_change) = gene.fold_change {
            *sums.entry(gene.name.trim()).or_default() += fold_change;
        }
    }
    sums.into_iter()
        .map(|(gene, fold_change)| GeneFoldChange {
            gene: gene.to_string(),
            fold_change,
        })
        .sorted_by(|a, b| b.fold_change.partial_cmp(&a.fold_change).unwrap_or(Ordering::Equal))
        .collect()
}

pub fn tag_counts(tractability: &[TractabilityRecord]) -> Vec<Count> {
    counted(tractability.iter().flat_map(|r| r.tags.iter().map(String::as_str)))
}

pub fn biotype_counts(tractability: &[TractabilityRecord]) -> Vec<Count> {
    counted(tractability.iter().filter_map(|r| r.biotype.as_deref()))
}

pub fn interaction_type_counts(interactions: &[DrugInteractionRecord]) -> Vec<Count> {
    counted(interactions.iter().filter_map(|i| i.interaction_type.as_deref()))
}

/// `GENE → DRUG` pairs grouped by interaction type, types in order of first appearance.
pub fn interactions_by_type(interactions: &[DrugInteractionRecord]) -> IndexMap<String, Vec<String>> {
    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
    for interaction in interactions.iter() {
        let Some(interaction_type) = interaction.interaction_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        grouped
            .entry(interaction_type.to_string())
            .or_default()
            .push(format!("{} → {}", interaction.gene_name.trim(), interaction.drug_name.trim()));
    }
    grouped
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub fold_change_by_gene: Vec<GeneFoldChange>,
    pub tractability_tags: Vec<Count>,
    pub biotypes: Vec<Count>,
    pub interaction_types: Vec<Count>,
    pub interactions_by_type: IndexMap<String, Vec<String>>,
}

pub fn summarize(expression: &[GeneRecord], tractability: &[TractabilityRecord], interactions: &[DrugInteractionRecord]) -> Summary {
    Summary {
        fold_change_by_gene: fold_change_by_gene(expression),
        tractability_tags: tag_counts(tractability),
        biotypes: biotype_counts(tractability),
        interaction_types: interaction_type_counts(interactions),
        interactions_by_type: interactions_by_type(interactions),
    }
}
