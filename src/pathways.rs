use crate::model::{GeneRecord, PathwayRecord};
use crate::normalize::{normalize, GeneKey};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use std::cmp::Ordering;

/// Gene → pathways multimap, pathways listed in enrichment result order.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PathwayMembershipIndex {
    memberships: IndexMap<GeneKey, Vec<String>>,
}

impl PathwayMembershipIndex {
    pub fn build(pathways: &[PathwayRecord]) -> Self {
        let mut memberships: IndexMap<GeneKey, Vec<String>> = IndexMap::new();
        for pathway in pathways.iter() {
            for gene in pathway.genes.iter().map(|g| normalize(g)).filter(|g| !g.is_empty()) {
                let entry = memberships.entry(gene).or_default();
                // a gene listed twice by one pathway still counts once
                if entry.last() != Some(&pathway.name) {
                    entry.push(pathway.name.clone());
                }
            }
        }
        debug!("membership index covers {} genes across {} pathways", memberships.len(), pathways.len());
        Self { memberships }
    }

    pub fn membership_of(&self, gene: &str) -> &[String] {
        self.memberships.get(normalize(gene).as_str()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn membership_of_key(&self, gene: &GeneKey) -> &[String] {
        self.memberships.get(gene).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }
}

/// Expression rows that belong to `pathway`, largest absolute fold change
/// first. Rows without a fold change go last; ties keep expression order.
pub fn overlapping_genes<'a>(expression: &'a [GeneRecord], pathway: &PathwayRecord) -> Vec<&'a GeneRecord> {
    let members: Vec<GeneKey> = pathway.genes.iter().map(|g| normalize(g)).collect();
    expression
        .iter()
        .filter(|gene| members.contains(&gene.key()))
        .sorted_by(|a, b| match (a.abs_fold_change(), b.abs_fold_change()) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .collect()
}

/// Distinct gene names of the whole expression table, in table order; the
/// list handed to the drug-interaction lookup for the summary report.
pub fn drug_query_genes(expression: &[GeneRecord]) -> Vec<GeneKey> {
    expression.iter().map(GeneRecord::key).unique().collect()
}

/// The same list restricted to the genes of one pathway.
pub fn pathway_query_genes(expression: &[GeneRecord], pathway: &PathwayRecord) -> Vec<GeneKey> {
    overlapping_genes(expression, pathway).into_iter().map(GeneRecord::key).unique().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pathways() -> Vec<PathwayRecord> {
        vec![
            PathwayRecord::new("P1", 0.001, &["GENEA", "GENEB"]),
            PathwayRecord::new("P2", 0.01, &["genea ", "GENEC", "GENEA"]),
            PathwayRecord::new("P3", 0.02, &["GENEC"]),
        ]
    }

    #[test]
    fn membership_keeps_result_order_without_duplicates() {
        let index = PathwayMembershipIndex::build(&pathways());
        assert_eq!(index.membership_of("GeneA"), &["P1".to_string(), "P2".to_string()]);
        assert_eq!(index.membership_of("GENEC"), &["P2".to_string(), "P3".to_string()]);
        assert!(index.membership_of("GENEZ").is_empty());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn build_does_not_touch_the_pathways() {
        let input = pathways();
        let before = input.clone();
        let _ = PathwayMembershipIndex::build(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn overlapping_genes_sorted_by_absolute_fold_change() {
        let expression = vec![
            GeneRecord::new("E1", "GENEA", 1.0),
            GeneRecord::new("E2", "GENEB", -3.0),
            GeneRecord::new("E3", "GENEC", 2.0),
        ];
        let pathway = PathwayRecord::new("P", 0.01, &["GENEA", "geneb"]);
        let names: Vec<&str> = overlapping_genes(&expression, &pathway).iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["GENEB", "GENEA"]);
        assert_eq!(pathway_query_genes(&expression, &pathway), vec![normalize("GENEB"), normalize("GENEA")]);
    }

    #[test]
    fn drug_query_genes_are_distinct() {
        let expression = vec![GeneRecord::new("E1", "GENEA", 1.0), GeneRecord::new("E2", "genea", 2.0), GeneRecord::new("E3", "GENEB", 1.0)];
        assert_eq!(drug_query_genes(&expression), vec![normalize("GENEA"), normalize("GENEB")]);
    }
}
