use crate::normalize::{normalize, GeneKey};
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One differentially expressed gene.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneRecord {
    pub identifier: Option<String>,
    pub name: String,
    pub fold_change: Option<f64>,
}

impl GeneRecord {
    pub fn new(identifier: &str, name: &str, fold_change: f64) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            name: name.to_string(),
            fold_change: Some(fold_change),
        }
    }

    pub fn key(&self) -> GeneKey {
        normalize(&self.name)
    }

    pub fn abs_fold_change(&self) -> Option<f64> {
        self.fold_change.map(f64::abs)
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct TractabilityRecord {
    pub identifier: Option<String>,
    pub gene_name: String,
    pub tags: Vec<String>,
    pub biotype: Option<String>,
    /// The tag cell exactly as it arrived.
    pub raw_tags: Option<String>,
}

impl TractabilityRecord {
    pub fn new(gene_name: &str, tags: &[&str], biotype: &str) -> Self {
        Self {
            identifier: None,
            gene_name: gene_name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            biotype: Some(biotype.to_string()),
            raw_tags: Some(tags.join(";")),
        }
    }

    pub fn key(&self) -> GeneKey {
        normalize(&self.gene_name)
    }
}

/// `hits/size` as reported by the enrichment service, e.g. `2/50`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Overlap {
    pub hits: usize,
    pub size: usize,
}

impl FromStr for Overlap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hits, size) = s.trim().split_once('/').ok_or_else(|| format!("expected 'hits/size', got '{}'", s))?;
        let hits = hits.trim().parse::<usize>().map_err(|e| e.to_string())?;
        let size = size.trim().parse::<usize>().map_err(|e| e.to_string())?;
        Ok(Overlap { hits, size })
    }
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hits, self.size)
    }
}

/// One enriched pathway. Read-only once produced by an enrichment run.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PathwayRecord {
    pub name: String,
    pub adjusted_p_value: Option<f64>,
    pub overlap: Option<Overlap>,
    pub input_percent: Option<f64>,
    pub fold_change_sum: Option<f64>,
    /// Member gene display names in source order.
    pub genes: Vec<String>,
}

impl PathwayRecord {
    pub fn new(name: &str, adjusted_p_value: f64, genes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            adjusted_p_value: Some(adjusted_p_value),
            genes: genes.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    /// `-log10(adjusted p)`, undefined for missing or non-positive values.
    pub fn neg_log10_p(&self) -> Option<f64> {
        self.adjusted_p_value.filter(|p| *p > 0.0).map(|p| -p.log10())
    }

    pub fn contains(&self, gene: &GeneKey) -> bool {
        self.genes.iter().any(|g| normalize(g) == *gene)
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct DrugInteractionRecord {
    pub gene_name: String,
    pub drug_name: String,
    pub interaction_type: Option<String>,
    pub score: Option<f64>,
    pub citation_id: Option<String>,
    pub source: Option<String>,
}

impl DrugInteractionRecord {
    pub fn new(gene_name: &str, drug_name: &str, interaction_type: &str, score: f64, citation_id: &str) -> Self {
        Self {
            gene_name: gene_name.to_string(),
            drug_name: drug_name.to_string(),
            interaction_type: Some(interaction_type.to_string()),
            score: Some(score),
            citation_id: Some(citation_id.to_string()),
            source: None,
        }
    }

    pub fn key(&self) -> GeneKey {
        normalize(&self.gene_name)
    }
}
